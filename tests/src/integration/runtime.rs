//! # Runtime
//!
//! The `xbridge` command layer driven from the sample deployment file.

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use xb_runtime::{commands, Deployment, SendArgs, SimnetRuntime};
    use xb_transfer::{cancel_pair, OrchestratorConfig, TransferStatus};

    fn sample_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../crates/xb-runtime/deployment.example.toml")
    }

    fn runtime(tweak: impl FnOnce(OrchestratorConfig) -> OrchestratorConfig) -> SimnetRuntime {
        let deployment = Deployment::load(sample_path()).unwrap();
        let config = deployment
            .orchestrator_config(OrchestratorConfig::default())
            .unwrap();
        SimnetRuntime::build(deployment, tweak(config)).unwrap()
    }

    fn send_args(from: &str, to: &str, amount: &str) -> SendArgs {
        SendArgs {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
            min_amount: None,
            recipient: None,
            refund: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_sample_deployment_loads() {
        let deployment = Deployment::load(sample_path()).unwrap();
        assert_eq!(deployment.endpoints.len(), 3);
        assert_eq!(deployment.topology().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_sample_wire_and_audit() {
        let runtime = runtime(|c| c);

        let (lines, failures) = commands::wire(&runtime).await;
        assert_eq!(failures, 0);
        assert_eq!(lines.len(), 4);
        let sepolia = lines
            .iter()
            .find(|l| l.starts_with("sepolia -> arbitrum-sepolia"))
            .unwrap();
        assert!(sepolia.ends_with("; verifiers set; executor set"), "{sepolia}");

        let (_, unwired) = commands::audit(&runtime).await;
        assert_eq!(unwired, 0);

        let (again, failures) = commands::wire(&runtime).await;
        assert_eq!(failures, 0);
        assert!(again
            .iter()
            .any(|l| l == "sepolia -> arbitrum-sepolia: already wired; verifiers ok; executor ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_send_confirms() {
        let mut runtime = runtime(|c| c);
        runtime.start_relayer();
        let request = commands::build_request(
            &runtime,
            &send_args("arbitrum-sepolia", "sepolia", "12.5"),
        )
        .unwrap();
        let (_handle, cancel) = cancel_pair();

        let outcome = commands::send(&runtime, &request, runtime.owner(), &cancel).await;

        assert_eq!(outcome.status(), &TransferStatus::Confirmed);
        let report = commands::describe_outcome(&outcome);
        assert!(report.iter().any(|l| l == "delivered: 12.5"));
    }

    #[tokio::test]
    async fn test_sample_dry_run() {
        let runtime = runtime(|c| c.with_dry_run(true));
        let request =
            commands::build_request(&runtime, &send_args("sepolia", "40231", "1")).unwrap();
        let (_handle, cancel) = cancel_pair();

        let outcome = commands::send(&runtime, &request, runtime.owner(), &cancel).await;

        assert_eq!(outcome.status(), &TransferStatus::Simulated);
        assert_eq!(runtime.simnet().pending_messages(), 0);
    }
}
