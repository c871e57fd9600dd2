//! `wire`, `audit` and `send`, reporting as human-readable lines.

use crate::runtime::SimnetRuntime;
use primitive_types::U256;
use xb_telemetry::{
    log_event, log_peer_event, log_stage_event, log_tx_event, record_fee_fallback,
    record_peer_reconcile, record_transfer,
};
use xb_transfer::{
    format_units, parse_units, Address, AuditEntry, AuditStatus, CancelSignal, EndpointId,
    FeeSource, TransferApi, TransferError, TransferOutcome, TransferRequest, WiringReport,
    NATIVE_DECIMALS,
};

/// Parameters of `send`.
#[derive(clap::Args, Clone, Debug)]
pub struct SendArgs {
    /// Source endpoint (name or id).
    #[arg(long)]
    pub from: String,
    /// Destination endpoint (name or id).
    #[arg(long)]
    pub to: String,
    /// Amount in whole units, decimal.
    #[arg(long)]
    pub amount: String,
    /// Minimum received amount; defaults to `amount`.
    #[arg(long)]
    pub min_amount: Option<String>,
    /// Recipient; defaults to the owner.
    #[arg(long)]
    pub recipient: Option<Address>,
    /// Fee refund address; defaults to the owner.
    #[arg(long)]
    pub refund: Option<Address>,
    /// Stop after a successful simulation.
    #[arg(long)]
    pub dry_run: bool,
}

/// Reconcile every connection and its path settings. Returns the report
/// lines and the number of connections with any failure.
pub async fn wire(runtime: &SimnetRuntime) -> (Vec<String>, usize) {
    let reports = runtime.service().wire().await;
    let failures = reports.iter().filter(|r| !r.is_ok()).count();
    let lines = reports
        .iter()
        .map(|report| {
            let (from, to) = (report.connection.from, report.connection.to);
            match &report.result {
                Ok(r) if r.changed => {
                    record_peer_reconcile("changed");
                    log_peer_event!(info, "peer binding written", from, to);
                }
                Ok(_) => record_peer_reconcile("unchanged"),
                Err(err) => {
                    record_peer_reconcile("failed");
                    log_peer_event!(warn, "peer binding failed", from, to, error = %err);
                }
            }
            for (kind, result) in &report.settings {
                match result {
                    Ok(r) if r.changed => {
                        log_peer_event!(info, "path setting written", from, to, config = %kind)
                    }
                    Ok(_) => {}
                    Err(err) => log_peer_event!(
                        warn,
                        "path setting failed",
                        from,
                        to,
                        config = %kind,
                        error = %err
                    ),
                }
            }
            describe_wiring(runtime, report)
        })
        .collect();
    (lines, failures)
}

fn describe_wiring(runtime: &SimnetRuntime, report: &WiringReport) -> String {
    let deployment = runtime.deployment();
    let edge = format!(
        "{} -> {}",
        deployment.name_of(report.connection.from),
        deployment.name_of(report.connection.to)
    );
    let mut line = match &report.result {
        Ok(r) => match &r.transaction_id {
            Some(tx) => format!("{edge}: peer set (tx {tx})"),
            None => format!("{edge}: already wired"),
        },
        Err(err) => format!("{edge}: FAILED {err}"),
    };
    for (kind, result) in &report.settings {
        let part = match result {
            Ok(r) if r.changed => format!("{kind} set"),
            Ok(_) => format!("{kind} ok"),
            Err(err) => format!("{kind} FAILED {err}"),
        };
        line.push_str("; ");
        line.push_str(&part);
    }
    line
}

/// Check every connection. Returns the lines and the number of unwired edges.
pub async fn audit(runtime: &SimnetRuntime) -> (Vec<String>, usize) {
    let entries = runtime.service().audit().await;
    let unwired = entries.iter().filter(|e| !e.is_wired()).count();
    let lines = entries
        .iter()
        .map(|entry| describe_audit(runtime, entry))
        .collect();
    (lines, unwired)
}

fn describe_audit(runtime: &SimnetRuntime, entry: &AuditEntry) -> String {
    let deployment = runtime.deployment();
    let edge = format!(
        "{} -> {}",
        deployment.name_of(entry.connection.from),
        deployment.name_of(entry.connection.to)
    );
    match &entry.status {
        Ok(AuditStatus::Wired) => format!("{edge}: ok"),
        Ok(AuditStatus::Missing) => format!("{edge}: missing (expected {})", entry.expected),
        Ok(AuditStatus::Mismatch { actual }) => {
            format!("{edge}: mismatch (expected {}, found {actual})", entry.expected)
        }
        Err(err) => format!("{edge}: unreadable ({err})"),
    }
}

/// Build a transfer request from CLI arguments.
pub fn build_request(
    runtime: &SimnetRuntime,
    args: &SendArgs,
) -> Result<TransferRequest, TransferError> {
    let deployment = runtime.deployment();
    let source = resolve(runtime, &args.from)?;
    let destination = resolve(runtime, &args.to)?;
    let amount = parse_units(&args.amount, NATIVE_DECIMALS)?;
    let min_amount = match &args.min_amount {
        Some(min) => parse_units(min, NATIVE_DECIMALS)?,
        None => amount,
    };

    TransferRequest::builder(
        source,
        destination,
        args.recipient.unwrap_or(deployment.owner),
    )
    .amount(amount)
    .min_amount(min_amount)
    .build()
}

fn resolve(runtime: &SimnetRuntime, key: &str) -> Result<EndpointId, TransferError> {
    runtime
        .deployment()
        .resolve(key)
        .map_err(|e| TransferError::InvalidRequest(e.to_string()))
}

/// Run one transfer and record its metrics.
pub async fn send(
    runtime: &SimnetRuntime,
    request: &TransferRequest,
    refund: Address,
    cancel: &CancelSignal,
) -> TransferOutcome {
    log_event!(
        info,
        "runtime",
        "sending transfer",
        amount = %format_units(request.amount, NATIVE_DECIMALS),
        from = %runtime.deployment().name_of(request.source),
        to = %runtime.deployment().name_of(request.destination)
    );

    let outcome = runtime.service().transfer(request, refund, cancel).await;

    if let Some(tx) = outcome.transaction_id() {
        log_tx_event!(info, "runtime", "transfer accepted", tx, source = %request.source);
    }
    if let Some(last) = outcome.stages().last() {
        log_stage_event!(
            info,
            outcome.run_id(),
            last.stage,
            last.outcome,
            status = outcome.status().label()
        );
    }

    let stages: Vec<(&str, &str)> = outcome
        .stages()
        .iter()
        .map(|s| (s.stage.as_str(), s.outcome.as_str()))
        .collect();
    record_transfer(outcome.status().label(), &stages, outcome.poll_attempts());
    if outcome.fee_source() == Some(FeeSource::Fallback) {
        record_fee_fallback(&request.source.to_string());
    }
    outcome
}

/// Human-readable report of a transfer.
pub fn describe_outcome(outcome: &TransferOutcome) -> Vec<String> {
    let mut lines = vec![outcome.summary()];
    if let Some(fee) = outcome.fee() {
        let source = match outcome.fee_source() {
            Some(FeeSource::Fallback) => " (fallback)",
            _ => "",
        };
        lines.push(format!(
            "fee: {}{}",
            format_units(fee.native_fee, NATIVE_DECIMALS),
            source
        ));
    }
    if let Some(simulation) = outcome.simulation() {
        lines.push(format!(
            "simulation: guid {}, receives {}",
            simulation.message_id,
            format_units(simulation.amount_received, NATIVE_DECIMALS)
        ));
    }
    if let Some(delta) = outcome.observed_delta() {
        lines.push(format!(
            "delivered: {}",
            format_units(delta, NATIVE_DECIMALS)
        ));
    }
    lines.push(format!("run: {}", outcome.run_id()));
    lines
}

/// Balance of `account` on `endpoint` in the asset its adapter carries.
pub fn balance_line(runtime: &SimnetRuntime, endpoint: EndpointId, account: Address) -> String {
    let deployment = runtime.deployment();
    let balance: U256 = match deployment
        .endpoints
        .iter()
        .find(|e| e.eid == endpoint.get())
    {
        Some(e) if !e.native => runtime.simnet().token_balance(endpoint, e.contract, account),
        _ => runtime.simnet().native_balance(endpoint, account),
    };
    format!(
        "{} balance of {}: {}",
        deployment.name_of(endpoint),
        account,
        format_units(balance, NATIVE_DECIMALS)
    )
}
