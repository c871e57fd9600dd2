//! Structured logging helpers.
//!
//! Every event carries a `component` field plus the domain fields for its
//! kind (`run_id`/`stage`/`outcome`, `tx`, `local`/`remote`), so JSON logs
//! can be filtered without parsing messages.

/// Log an event with a component tag.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = $component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = $component, $($($field)*,)? $msg)
    };
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(component = $component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = $component, $($($field)*,)? $msg)
    };
}

/// Log a pipeline stage transition with standard fields.
#[macro_export]
macro_rules! log_stage_event {
    ($level:ident, $run_id:expr, $stage:expr, $outcome:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "orchestrator",
            run_id = %$run_id,
            stage = %$stage,
            outcome = %$outcome,
            $($($field)*,)?
            "stage transition"
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $component:expr, $msg:expr, $tx:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            tx = %$tx,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a peer-binding event with standard fields.
#[macro_export]
macro_rules! log_peer_event {
    ($level:ident, $msg:expr, $local:expr, $remote:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "wiring",
            local = %$local,
            remote = %$remote,
            $($($field)*,)?
            $msg
        )
    };
}
