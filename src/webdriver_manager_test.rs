// Unit tests for the WebDriver manager

use super::*;

#[test]
fn test_command_exists_for_shell_builtin() {
    // `ls` is present on every supported platform's PATH
    assert!(WebDriverManager::command_exists("ls"));
    assert!(!WebDriverManager::command_exists(
        "definitely-not-a-real-binary-name"
    ));
}

#[test]
fn test_find_free_port_returns_usable_port() {
    let port = WebDriverManager::find_free_port_for_browser(&BrowserType::Firefox).unwrap();
    assert!(port > 0);
    // The returned port must be bindable at the moment of the check
    assert!(!WebDriverManager::is_port_in_use(port) || port >= 4444);
}

#[test]
fn test_is_port_in_use_detects_bound_port() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    assert!(WebDriverManager::is_port_in_use(port));
    drop(listener);
}

#[test]
fn test_missing_runtime_classification() {
    let missing = anyhow::anyhow!("geckodriver not found in PATH");
    assert!(WebDriverManager::is_missing_runtime(&missing));

    let other = anyhow::anyhow!("WebDriver failed to start within timeout");
    assert!(!WebDriverManager::is_missing_runtime(&other));

    // Context wrapping must not hide the marker
    let wrapped = missing.context("launch failed");
    assert!(WebDriverManager::is_missing_runtime(&wrapped));
}

#[tokio::test]
async fn test_is_driver_running_false_without_driver() {
    // Nothing should be listening on this freshly allocated port
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = format!("http://localhost:{}", port);
    assert!(!WebDriverManager::is_driver_running(&url).await);
}
