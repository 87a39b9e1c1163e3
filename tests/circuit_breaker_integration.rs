//! Circuit breaker integration tests - per-dependency configuration

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use citation_gateway::config::CircuitBreakerConfig;
use citation_gateway::failsafe::{CircuitBreaker, CircuitState};
use citation_gateway::{Error, Result};

async fn server_error(cb: &CircuitBreaker) -> Result<()> {
    cb.call(|| async { Err(Error::RemoteServer { status: 500 }) })
        .await
}

async fn success(cb: &CircuitBreaker) -> Result<u32> {
    cb.call(|| async { Ok(1) }).await
}

#[tokio::test]
async fn custom_config_opens_at_its_own_threshold() {
    // Stricter configuration
    let custom_config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 3,
        success_threshold: 4,
        recovery_timeout: Duration::from_secs(60),
    };

    let cb = CircuitBreaker::new("custom-remote", &custom_config);

    for _ in 0..2 {
        server_error(&cb).await.ok();
    }
    assert_eq!(cb.state(), CircuitState::Closed);

    server_error(&cb).await.ok(); // Third failure
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn lenient_config_tolerates_more_failures() {
    // More lenient configuration for flaky dependencies
    let lenient_config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 10,
        success_threshold: 2,
        recovery_timeout: Duration::from_secs(30),
    };

    let cb = CircuitBreaker::new("flaky-remote", &lenient_config);

    for _ in 0..5 {
        server_error(&cb).await.ok();
    }
    assert_eq!(cb.state(), CircuitState::Closed);

    for _ in 0..5 {
        server_error(&cb).await.ok();
    }
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test]
async fn open_breaker_rejects_without_invoking_the_operation() {
    let config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 3,
        success_threshold: 2,
        recovery_timeout: Duration::from_secs(30),
    };
    let cb = CircuitBreaker::new("uspto-citations", &config);

    // Exactly threshold consecutive breaker-relevant failures
    for _ in 0..3 {
        server_error(&cb).await.ok();
    }

    let invocations = AtomicU32::new(0);
    let result = cb
        .call(|| {
            invocations.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert!(matches!(result, Err(Error::CircuitOpen { .. })));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn status_message_reports_state_and_retry_hint() {
    let config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 3,
        success_threshold: 2,
        recovery_timeout: Duration::from_secs(30),
    };

    let cb = CircuitBreaker::new("test-remote", &config);

    let message = cb.status_message();
    assert!(message.contains("test-remote"));
    assert!(message.contains("closed"));

    for _ in 0..3 {
        server_error(&cb).await.ok();
    }
    let message = cb.status_message();
    assert!(message.contains("Dependency 'test-remote'"));
    assert!(message.contains("circuit breaker is open"));
    assert!(message.contains("3 failures"));
    assert!(message.contains("retry in"));
    assert!(message.contains("seconds"));
}

#[tokio::test]
async fn disabled_breaker_never_opens() {
    let disabled_config = CircuitBreakerConfig {
        enabled: false,
        failure_threshold: 3,
        success_threshold: 2,
        recovery_timeout: Duration::from_secs(30),
    };

    let cb = CircuitBreaker::new("disabled-remote", &disabled_config);

    for _ in 0..100 {
        server_error(&cb).await.ok();
    }
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(success(&cb).await.is_ok());
}

#[tokio::test]
async fn half_open_after_recovery_timeout() {
    let config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 2,
        success_threshold: 3,
        recovery_timeout: Duration::from_millis(10),
    };

    let cb = CircuitBreaker::new("recovery-remote", &config);

    cb.call(|| async { Err::<(), _>(Error::Timeout(Duration::from_secs(30))) })
        .await
        .ok();
    server_error(&cb).await.ok();
    assert_eq!(cb.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(15)).await;

    // First call after the timeout is the trial; one success is below the
    // success threshold, so the breaker stays half-open.
    success(&cb).await.unwrap();
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    let message = cb.status_message();
    assert!(message.contains("half-open"));
    assert!(message.contains("testing recovery"));
}

#[tokio::test]
async fn multiple_dependencies_have_independent_state() {
    let config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 3,
        success_threshold: 2,
        recovery_timeout: Duration::from_secs(30),
    };

    let cb1 = CircuitBreaker::new("remote-1", &config);
    let cb2 = CircuitBreaker::new("remote-2", &config);

    for _ in 0..3 {
        server_error(&cb1).await.ok();
    }

    assert_eq!(cb1.state(), CircuitState::Open);
    assert!(cb1.status_message().contains("is open"));

    assert_eq!(cb2.state(), CircuitState::Closed);
    assert!(cb2.status_message().contains("closed"));
}

#[tokio::test]
async fn concurrent_callers_admit_a_single_trial() {
    let config = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 1,
        success_threshold: 2,
        recovery_timeout: Duration::from_millis(10),
    };
    let cb = std::sync::Arc::new(CircuitBreaker::new("trial-remote", &config));

    server_error(&cb).await.ok();
    tokio::time::sleep(Duration::from_millis(15)).await;

    // Ten tasks race for the trial slot; the trial itself parks long enough
    // that every competitor hits the in-flight rejection.
    let admitted = std::sync::Arc::new(AtomicU32::new(0));
    let mut handles = Vec::new();
    for _ in 0..10 {
        let cb = std::sync::Arc::clone(&cb);
        let admitted = std::sync::Arc::clone(&admitted);
        handles.push(tokio::spawn(async move {
            cb.call(|| {
                admitted.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(())
                }
            })
            .await
        }));
    }

    let mut rejected = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), Err(Error::CircuitOpen { .. })) {
            rejected += 1;
        }
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 1);
    assert_eq!(rejected, 9);
}
