pub mod group;
pub mod paging;
pub mod post;
pub mod profile;

pub use paging::{Page, Paging};

crate::repository_from_request!(quill_dal::post::PostRepository);
crate::repository_from_request!(quill_dal::group::GroupRepository);
crate::repository_from_request!(quill_dal::comment::CommentRepository);
crate::repository_from_request!(quill_dal::follow::FollowRepository);
crate::repository_from_request!(quill_dal::rating::RatingRepository);
