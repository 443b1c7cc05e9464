use tracing::{debug, info, instrument};

use crate::client::VraClient;
use crate::config::Credentials;
use crate::error::Result;
use crate::locate::{find_snapshot_action, find_vm_resource, NameMatch};
use crate::poll::{wait_for_completion, PollPolicy};
use crate::vra::{ActionId, BearerToken, ResourceId, SnapshotRequest};

/// Everything the command line decides about one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub machine_name: String,
    pub keep_existing: bool,
    pub dry_run: bool,
    pub name_match: NameMatch,
    pub poll: PollPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    DryRun,
}

#[instrument(skip_all, fields(machine = %options.machine_name))]
pub async fn run(credentials: &Credentials, options: &RunOptions) -> Result<Outcome> {
    info!(
        "Creating snapshot of virtual machine {:?} for tenant {:?}",
        options.machine_name, credentials.tenant
    );

    let client = VraClient::new(&credentials.base_url)?;

    info!("Step 1 - Get bearer token");
    let token = client.authenticate(credentials).await?;
    if let Some(expires) = token.expires() {
        debug!("Bearer token expires at {}", expires);
    }

    info!(
        "Step 2 - Get virtual machine resource ID for {}",
        options.machine_name
    );
    let resources = client.list_resources(&token).await?;
    let resource = find_vm_resource(&resources, &options.machine_name, options.name_match)?;

    info!(
        "Step 3 - Get snapshot resource action ID for {}",
        options.machine_name
    );
    let actions = client.list_actions(&token, &resource).await?;
    let action = find_snapshot_action(&actions)?;

    fetch_action_template(&resource, &action);

    if options.dry_run {
        info!("Step 5 - Skipped because of dry-run");
        info!("Step 6 - Skipped because of dry-run");
        info!("Bye from makeSnapshot");
        return Ok(Outcome::DryRun);
    }

    submit_and_wait(&client, &token, credentials, options, &resource, &action).await?;

    info!("Bye from makeSnapshot");
    Ok(Outcome::Created)
}

/// Placeholder for `GET .../actions/{action}/requests/template`.
///
/// The template would let the request body be filled from what the platform expects
/// instead of the fixed layout in [`SnapshotRequest`]. No call is made yet.
fn fetch_action_template(resource: &ResourceId, action: &ActionId) {
    info!("Step 4 - Get resource action template");
    debug!(
        "Template lookup for resource {} action {} not performed",
        resource, action
    );
}

async fn submit_and_wait(
    client: &VraClient,
    token: &BearerToken,
    credentials: &Credentials,
    options: &RunOptions,
    resource: &ResourceId,
    action: &ActionId,
) -> Result<()> {
    info!(
        "Step 5 - Send snapshot request for {}",
        options.machine_name
    );
    let request = SnapshotRequest::new(&credentials.tenant, options.keep_existing);
    let status_url = client
        .submit_snapshot_request(token, resource, action, &request)
        .await?;
    debug!("Request status URL: {}", status_url);

    info!("Step 6 - Get snapshot request status...");
    let attempts = wait_for_completion(client, token, &status_url, options.poll).await?;
    debug!("Snapshot request finished after {} polls", attempts);

    Ok(())
}
