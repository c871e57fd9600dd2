//! # Peer Registry Reconciler
//!
//! Read-verify-write of one peer binding. A write is issued only when the
//! recorded address differs from the desired one, re-read under the signer
//! lock so concurrent runs never write the same pair twice. Path settings
//! (verifiers, executor) follow the same read-verify-write pattern.

use super::signer_locks::SignerLocks;
use crate::domain::{canonical, Address, ConfigKind, EndpointId, ReconcileResult, TransferError};
use crate::ports::{ConfigCapability, PeerCapability};
use tracing::{debug, info};

/// Ensure `adapter`'s binding for `remote` equals `desired`.
///
/// Equality is on normalized 32-byte addresses, so letter case and 20/32-byte
/// encodings never cause a spurious write. Read and write failures come back
/// as `ReconcileError` with the cause attached; nothing is retried.
pub async fn reconcile<A>(
    adapter: &A,
    local: EndpointId,
    remote: EndpointId,
    desired: Address,
    locks: &SignerLocks,
) -> Result<ReconcileResult, TransferError>
where
    A: PeerCapability + ?Sized,
{
    if adapter.local_endpoint() != local {
        return Err(TransferError::InvalidRequest(format!(
            "adapter lives on endpoint {}, not {}",
            adapter.local_endpoint(),
            local
        )));
    }

    let wrap = |cause: TransferError| TransferError::ReconcileError {
        local,
        remote,
        cause: Box::new(cause),
    };

    let current = adapter.get_peer(remote).await.map_err(wrap)?;
    if current == desired {
        debug!(
            "[xb-transfer] Peer {} -> {} already set to {}",
            local, remote, desired
        );
        return Ok(ReconcileResult::unchanged());
    }

    // Another run may have written while we waited for the signer.
    let _guard = locks.acquire(adapter.signer()).await;
    let current = adapter.get_peer(remote).await.map_err(wrap)?;
    if current == desired {
        debug!(
            "[xb-transfer] Peer {} -> {} set concurrently to {}",
            local, remote, desired
        );
        return Ok(ReconcileResult::unchanged());
    }

    info!(
        local = %local,
        remote = %remote,
        current = %current,
        desired = %desired,
        "[xb-transfer] Peer binding diverges, writing"
    );

    let tx = adapter.set_peer(remote, desired).await.map_err(wrap)?;

    info!(
        "[xb-transfer] Peer {} -> {} set in tx {}",
        local, remote, tx
    );
    Ok(ReconcileResult::changed(tx))
}

/// Ensure `adapter`'s `kind` setting for the path to `remote` equals
/// `desired`, compared in canonical order.
///
/// Errors are wrapped like [`reconcile`]'s.
pub async fn reconcile_config<A>(
    adapter: &A,
    remote: EndpointId,
    kind: ConfigKind,
    desired: &[Address],
    locks: &SignerLocks,
) -> Result<ReconcileResult, TransferError>
where
    A: PeerCapability + ConfigCapability + ?Sized,
{
    let local = adapter.local_endpoint();
    let wrap = |cause: TransferError| TransferError::ReconcileError {
        local,
        remote,
        cause: Box::new(cause),
    };
    let desired = canonical(desired.to_vec());

    let current = adapter.get_config(remote, kind).await.map_err(wrap)?;
    if canonical(current) == desired {
        debug!("[xb-transfer] {} for {} -> {} already set", kind, local, remote);
        return Ok(ReconcileResult::unchanged());
    }

    let _guard = locks.acquire(adapter.signer()).await;
    let current = canonical(adapter.get_config(remote, kind).await.map_err(wrap)?);
    if current == desired {
        debug!("[xb-transfer] {} for {} -> {} set concurrently", kind, local, remote);
        return Ok(ReconcileResult::unchanged());
    }

    info!(
        local = %local,
        remote = %remote,
        config_type = kind.code(),
        current = current.len(),
        desired = desired.len(),
        "[xb-transfer] Path {} diverges, writing", kind
    );

    let tx = adapter
        .set_config(remote, kind, &desired)
        .await
        .map_err(wrap)?;

    info!("[xb-transfer] {} for {} -> {} set in tx {}", kind, local, remote, tx);
    Ok(ReconcileResult::changed(tx))
}
