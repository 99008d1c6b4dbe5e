use quill_e2e_tests::{launch_env, test_config};
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _config_guard) = test_config("test_health").unwrap();
    let env = launch_env(args).await.unwrap();

    let client = env.client().unwrap();
    let response = client.get(env.url("health")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    env.stop().await;
}
