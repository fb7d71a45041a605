//! # HTTP Flows
//!
//! The full router (`CipherGatewayService::router`) over real worker
//! processes. Covers the response contract for every worker outcome, the
//! conversation endpoint, concurrent isolation and client disconnects.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::Router;
    use cipher_broker::BrokerConfig;
    use cipher_gateway::{CipherGatewayService, GatewayConfig};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::support::{
        counting_worker, get, invocation_count, post_json, read_json, shell_worker, PAYLOAD_TEXT,
    };

    fn gateway(worker: BrokerConfig) -> Router {
        let config = GatewayConfig {
            worker,
            ..GatewayConfig::default()
        };
        CipherGatewayService::new(config).unwrap().router()
    }

    // =========================================================================
    // POST /encrypt
    // =========================================================================

    #[tokio::test]
    async fn test_encrypt_success_relays_worker_output() {
        let router = gateway(shell_worker(
            r#"printf '{"encrypted":"Zm9v","iv":"aXY=","salt":"c2FsdA==","data":%s}' "$4""#,
        ));

        let response = router
            .oneshot(post_json(
                "/encrypt",
                &json!({ "data": { "card": "4111" }, "password": "pw" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({
                "encrypted": "Zm9v",
                "iv": "aXY=",
                "salt": "c2FsdA==",
                "data": { "card": "4111" }
            })
        );
    }

    #[tokio::test]
    async fn test_encrypt_worker_exit_failure() {
        let router = gateway(shell_worker("echo bad-password >&2; exit 1"));

        let response = router
            .oneshot(post_json("/encrypt", &json!({ "data": "x", "password": "nope" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Encryption failed", "details": "bad-password" })
        );
    }

    #[tokio::test]
    async fn test_encrypt_unparseable_output() {
        let router = gateway(shell_worker("echo not-json"));

        let response = router
            .oneshot(post_json("/encrypt", &json!({ "data": "x", "password": "pw" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Failed to parse encryption result");
        assert_eq!(body["rawOutput"], "not-json");
        assert!(body["parseError"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_encrypt_missing_worker_hides_os_error() {
        let router = gateway(BrokerConfig::for_program("/nonexistent/cipher-worker"));

        let response = router
            .oneshot(post_json("/encrypt", &json!({ "data": "x", "password": "pw" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Encryption failed" }));
    }

    #[tokio::test]
    async fn test_encrypt_timeout() {
        let router = gateway(BrokerConfig {
            timeout: Duration::from_millis(200),
            ..shell_worker("exec sleep 5")
        });

        let response = router
            .oneshot(post_json("/encrypt", &json!({ "data": "x", "password": "pw" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Encryption worker timed out", "timeoutMs": 200 })
        );
    }

    #[tokio::test]
    async fn test_encrypt_oversized_output() {
        let router = gateway(BrokerConfig {
            max_output_bytes: 16,
            ..shell_worker(r#"printf '{"ciphertext":"%s"}' "$(head -c 4096 /dev/zero | tr '\0' x)""#)
        });

        let response = router
            .oneshot(post_json("/encrypt", &json!({ "data": "x", "password": "pw" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Encryption failed" }));
    }

    #[tokio::test]
    async fn test_encrypt_oversized_stderr_truncated_in_details() {
        let router = gateway(BrokerConfig {
            max_output_bytes: 32,
            ..shell_worker(r#"head -c 4096 /dev/zero | tr '\0' e >&2; exit 1"#)
        });

        let response = router
            .oneshot(post_json("/encrypt", &json!({ "data": "x", "password": "pw" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Encryption failed");
        assert_eq!(body["details"], "e".repeat(32));
    }

    // =========================================================================
    // POST /chat/encrypt
    // =========================================================================

    #[tokio::test]
    async fn test_chat_plain_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let router = gateway(counting_worker(&log, r#"printf '{"ciphertext":"X"}'"#));

        let response = router
            .oneshot(post_json(
                "/chat/encrypt",
                &json!({ "messages": [{ "content": "hi", "sensitive": false }], "password": "pw" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({ "messages": [{ "content": "hi", "sensitive": false, "encrypted": false }] })
        );
        assert_eq!(invocation_count(&log), 0);
    }

    #[tokio::test]
    async fn test_chat_non_boolean_flags_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let router = gateway(counting_worker(&log, r#"printf '{"ciphertext":"X"}'"#));

        let response = router
            .oneshot(post_json(
                "/chat/encrypt",
                &json!({
                    "messages": [
                        { "content": "a", "sensitive": null },
                        { "content": "b", "sensitive": "yes" },
                        { "content": "c", "sensitive": 1, "encrypted": null }
                    ],
                    "password": "pw"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({
                "messages": [
                    { "content": "a", "sensitive": false, "encrypted": false },
                    { "content": "b", "sensitive": false, "encrypted": false },
                    { "content": "c", "sensitive": false, "encrypted": false }
                ]
            })
        );
        assert_eq!(invocation_count(&log), 0);
    }

    #[tokio::test]
    async fn test_chat_mixed_conversation_keeps_extra_fields() {
        let router = gateway(shell_worker(&format!(
            r#"{PAYLOAD_TEXT}; printf '{{"ciphertext":"enc(%s)"}}' "$d""#
        )));

        let response = router
            .oneshot(post_json(
                "/chat/encrypt",
                &json!({
                    "messages": [
                        { "role": "user", "content": "my card is 4111", "sensitive": true },
                        { "role": "assistant", "content": "noted", "sensitive": false }
                    ],
                    "password": "pw"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({
                "messages": [
                    { "role": "user", "content": "enc(my card is 4111)", "sensitive": true, "encrypted": true },
                    { "role": "assistant", "content": "noted", "sensitive": false, "encrypted": false }
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_chat_failure_returns_no_partial_result() {
        let router = gateway(shell_worker(&format!(
            r#"{PAYLOAD_TEXT}
            [ "$d" = poison ] && {{ echo bad-password >&2; exit 1; }}
            printf '{{"ciphertext":"ok"}}'"#
        )));

        let response = router
            .oneshot(post_json(
                "/chat/encrypt",
                &json!({
                    "messages": [
                        { "content": "fine", "sensitive": true },
                        { "content": "poison", "sensitive": true }
                    ],
                    "password": "pw"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "Encryption failed", "details": "bad-password" })
        );
    }

    #[tokio::test]
    async fn test_concurrent_requests_stay_isolated() {
        // each worker sleeps a password-dependent amount so requests interleave
        let router = gateway(BrokerConfig {
            max_concurrent: 8,
            ..shell_worker(&format!(
                r#"{PAYLOAD_TEXT}
                n=${{6#pw-}}
                sleep 0.$(( n % 3 ))
                printf '{{"ciphertext":"%s|%s"}}' "$6" "$d""#
            ))
        });

        let requests = (0..16).map(|i| {
            let router = router.clone();
            async move {
                let password = format!("pw-{i}");
                let response = router
                    .oneshot(post_json(
                        "/chat/encrypt",
                        &json!({
                            "messages": [
                                { "content": format!("secret-{i}"), "sensitive": true },
                                { "content": "public", "sensitive": false }
                            ],
                            "password": password
                        }),
                    ))
                    .await
                    .unwrap();
                (i, response.status(), read_json(response).await)
            }
        });

        for (i, status, body) in futures::future::join_all(requests).await {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["messages"][0]["content"], format!("pw-{i}|secret-{i}"));
            assert_eq!(body["messages"][1]["content"], "public");
        }
    }

    // =========================================================================
    // CLIENT DISCONNECT
    // =========================================================================

    #[tokio::test]
    async fn test_dropped_request_kills_worker() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let router = gateway(shell_worker(&format!(
            r#"sleep 1; touch '{}'; printf '{{"ciphertext":"late"}}'"#,
            marker.display()
        )));

        let pending = {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .oneshot(post_json(
                        "/chat/encrypt",
                        &json!({ "messages": [{ "content": "s", "sensitive": true }], "password": "pw" }),
                    ))
                    .await
            })
        };

        // client goes away while the worker is running
        tokio::time::sleep(Duration::from_millis(200)).await;
        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());

        let metrics = read_json(router.oneshot(get("/metrics")).await.unwrap()).await;
        assert_eq!(metrics["worker"]["in_flight"], 0);
        assert_eq!(metrics["worker"]["started"], 1);
    }
}
