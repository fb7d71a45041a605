//! # Broker Flows
//!
//! `SelectiveEncryptionPolicy` driving a real `ProcessWorker`:
//!
//! 1. Conversations without sensitive messages never start a process
//! 2. Sensitive messages are replaced in place, order preserved
//! 3. One failing message fails the conversation and stops its siblings
//! 4. Worker results without a `ciphertext` field are handled

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use cipher_broker::{
        CancellationToken, Message, PolicyError, ProcessWorker, SelectiveEncryptionPolicy,
        WorkerFailure,
    };
    use serde_json::{json, Value};

    use crate::support::{counting_worker, invocation_count, shell_worker, PAYLOAD_TEXT};

    fn policy_for(worker: ProcessWorker) -> (Arc<ProcessWorker>, SelectiveEncryptionPolicy) {
        let worker = Arc::new(worker);
        let policy = SelectiveEncryptionPolicy::new(worker.clone());
        (worker, policy)
    }

    // =========================================================================
    // POLICY OVER REAL PROCESSES
    // =========================================================================

    #[tokio::test]
    async fn test_plain_conversation_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let (_worker, policy) = policy_for(
            ProcessWorker::new(counting_worker(&log, r#"printf '{"ciphertext":"X"}'"#)).unwrap(),
        );

        let input = vec![Message::new("hi", false), Message::new("there", false)];
        let output = policy
            .apply(input.clone(), "pw", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output, input);
        assert_eq!(invocation_count(&log), 0);
    }

    #[tokio::test]
    async fn test_secret_message_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let script = r#"
            [ "$2" = encrypt ] || exit 3
            [ "$4" = '"secret"' ] || exit 4
            [ "$6" = pw ] || { echo bad-password >&2; exit 1; }
            printf '{"ciphertext":"XYZ"}'
        "#;
        let (_worker, policy) = policy_for(ProcessWorker::new(counting_worker(&log, script)).unwrap());

        let output = policy
            .apply(
                vec![Message::new("secret", true)],
                "pw",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!([{ "content": "XYZ", "sensitive": true, "encrypted": true }])
        );
        assert_eq!(invocation_count(&log), 1);
    }

    #[tokio::test]
    async fn test_order_preserved_with_uneven_workers() {
        // the first message takes longest, so completion order is reversed
        let script = format!(
            r#"{PAYLOAD_TEXT}
            case "$d" in
                m0) sleep 0.4 ;;
                m1) sleep 0.2 ;;
            esac
            printf '{{"ciphertext":"enc-%s"}}' "$d""#
        );
        let (_worker, policy) = policy_for(ProcessWorker::new(shell_worker(&script)).unwrap());

        let input = vec![
            Message::new("m0", true),
            Message::new("plain-a", false),
            Message::new("m1", true),
            Message::new("plain-b", false),
            Message::new("m2", true),
        ];
        let output = policy
            .apply(input, "pw", &CancellationToken::new())
            .await
            .unwrap();

        let contents: Vec<&str> = output.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["enc-m0", "plain-a", "enc-m1", "plain-b", "enc-m2"]
        );
        assert!(output[0].encrypted && !output[1].encrypted);
    }

    #[tokio::test]
    async fn test_failure_stops_sibling_workers() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("slow-finished");
        let script = format!(
            r#"{PAYLOAD_TEXT}
            if [ "$d" = slow ]; then sleep 2; touch '{}'; printf '{{"ciphertext":"late"}}'; exit 0; fi
            echo bad-password >&2
            exit 1"#,
            marker.display()
        );
        let (worker, policy) = policy_for(ProcessWorker::new(shell_worker(&script)).unwrap());

        let started = Instant::now();
        let err = policy
            .apply(
                vec![Message::new("slow", true), Message::new("fast", true)],
                "pw",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(err.index(), 1);
        match err {
            PolicyError::Worker {
                source: WorkerFailure::Worker { stderr, .. },
                ..
            } => assert_eq!(stderr, "bad-password"),
            other => panic!("unexpected error: {other:?}"),
        }

        // the slow sibling was killed before it could finish
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists());
        assert_eq!(worker.stats().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_conversation_kills_workers() {
        let (worker, policy) = policy_for(ProcessWorker::new(shell_worker("exec sleep 5")).unwrap());
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                cancel.cancel();
            })
        };

        let started = Instant::now();
        let err = policy
            .apply(
                vec![Message::new("a", true), Message::new("b", true)],
                "pw",
                &cancel,
            )
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(
            err,
            PolicyError::Worker {
                source: WorkerFailure::Cancelled,
                ..
            }
        ));
        assert_eq!(worker.stats().in_flight(), 0);
    }

    // =========================================================================
    // WORKER RESULT SHAPES
    // =========================================================================

    #[tokio::test]
    async fn test_envelope_result_kept_whole() {
        let (_worker, policy) = policy_for(
            ProcessWorker::new(shell_worker(
                r#"printf '{"encrypted":"Zm9v","iv":"aXY=","salt":"c2FsdA=="}'"#,
            ))
            .unwrap(),
        );

        let output = policy
            .apply(
                vec![Message::new("secret", true)],
                "pw",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let envelope: Value = serde_json::from_str(&output[0].content).unwrap();
        assert_eq!(
            envelope,
            json!({ "encrypted": "Zm9v", "iv": "aXY=", "salt": "c2FsdA==" })
        );
        assert!(output[0].encrypted);
    }

    #[tokio::test]
    async fn test_in_band_worker_error() {
        let (_worker, policy) = policy_for(
            ProcessWorker::new(shell_worker(r#"printf '{"error":"Invalid padding"}'"#)).unwrap(),
        );

        let err = policy
            .apply(
                vec![Message::new("secret", true)],
                "pw",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PolicyError::Rejected { index: 0, .. }));
    }
}
