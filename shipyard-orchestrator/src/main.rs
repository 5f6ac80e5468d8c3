//! Shipyard Orchestrator
//!
//! Deploys every completed build to its own staging environment, then lets
//! humans promote it through chat.
//!
//! Architecture:
//! - API: webhooks for CI (`/build-complete`) and chat (`/slack-interactions`)
//! - Queues: one bounded queue per webhook, one task per item
//! - Services: deployment pipeline, approval workflow, cluster reconciliation
//!
//! The server keeps no state between a build and its approval; everything a
//! button click needs travels in a signed payload embedded in the button.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use shipyard_client::{ClusterCredentials, KubeClient, SlackClient};
use shipyard_core::domain::Build;
use shipyard_core::dto::interaction::Interaction;
use shipyard_core::payload::PayloadCodec;

pub mod api;
pub mod config;
pub mod registry;
pub mod service;

use crate::config::Config;
use crate::registry::ProjectRegistry;
use crate::service::{ApprovalWorkflow, DeploymentPipeline, Notifier, Reconciler, WorkQueue};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipyard_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shipyard Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!("Loaded configuration: {:?}", config);

    let registry = Arc::new(
        ProjectRegistry::load(&config.projects_path).with_context(|| {
            format!(
                "Failed to load projects from {}",
                config.projects_path.display()
            )
        })?,
    );
    info!("Loaded {} projects", registry.len());

    let credentials = ClusterCredentials::from_kubeconfig(&config.kubeconfig_path)
        .context("Failed to read kubeconfig")?;
    let cluster = KubeClient::new(&credentials, config.timeouts())
        .context("Failed to create cluster client")?;
    info!(
        "Cluster client initialized for {} (namespace {})",
        credentials.server,
        cluster.namespace()
    );

    let chat = SlackClient::new(
        config.slack_api_url.clone(),
        config.slack_token.clone(),
        config.timeouts(),
    )
    .context("Failed to create chat client")?;

    let notifier = Notifier::new(Arc::new(chat));
    let reconciler = Reconciler::new(Arc::new(cluster));
    let codec = Arc::new(PayloadCodec::new(config.payload_secret.clone()));

    let pipeline = DeploymentPipeline::new(
        Arc::clone(&registry),
        notifier.clone(),
        reconciler.clone(),
        Arc::clone(&codec),
    );
    let approvals = ApprovalWorkflow::new(Arc::clone(&registry), notifier, reconciler, codec);

    let (builds, _build_dispatcher) =
        WorkQueue::spawn("build", config.queue_capacity, move |build: Build| {
            let pipeline = pipeline.clone();
            let span = info_span!(
                "build",
                run_id = %Uuid::new_v4(),
                project = %build.project,
                target = %build.target
            );
            async move {
                match pipeline.run(build).await {
                    Ok(report) => info!("Run finished in state {:?}", report.state),
                    Err(e) => error!("Run aborted: {}", e),
                }
            }
            .instrument(span)
        });

    let (interactions, _interaction_dispatcher) = WorkQueue::spawn(
        "interaction",
        config.queue_capacity,
        move |interaction: Interaction| {
            let approvals = approvals.clone();
            let span = info_span!(
                "interaction",
                run_id = %Uuid::new_v4(),
                category = %interaction.callback_id,
                user = %interaction.user.id
            );
            async move {
                match approvals.handle(interaction).await {
                    Ok(outcome) => info!("Interaction handled: {:?}", outcome),
                    Err(e) => error!("Interaction rejected: {}", e),
                }
            }
            .instrument(span)
        },
    );

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        registry,
        builds,
        interactions,
    });

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
