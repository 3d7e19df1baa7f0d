use std::convert::Infallible;
use std::sync::Arc;

use feed_api::{CredentialSource, Credentials, EventStore, FeedTransport, Partition, StreamFilter};
use ingest::{
    DescriptorSink, FileCredentials, LocalDescriptorSink, PartitionStores, ProjectDescriptor,
    ResilientFeedRunner, StreamListener,
};
use storage_memory::MemoryEventStore;
use storage_sqlite::SqliteEventStore;
use transport_file_replay::FileReplayTransport;
use transport_http_stream::HttpStreamTransport;

use super::config::{Effective, TransportKind};
use super::error::CollectorError;

// ═══════════════════════════════════════════════════════════════
//  Main dispatch
// ═══════════════════════════════════════════════════════════════

/// Publish the descriptor, then ingest until the retry budget runs out or
/// Ctrl+C arrives.
pub async fn run(eff: Effective) -> Result<(), CollectorError> {
    publish_descriptor(&eff);

    let project = eff.project.clone();
    tracing::info!(
        project = %project,
        track = ?eff.track,
        languages = ?eff.languages,
        transport = ?eff.feed.transport,
        dry_run = eff.dry_run,
        "starting collector, press Ctrl+C to stop"
    );

    // Блокирующий HTTP-клиент нельзя создавать и дропать внутри async-контекста,
    // поэтому весь ингест живёт в blocking-потоке.
    let worker = tokio::task::spawn_blocking(move || ingest(eff));

    tokio::select! {
        joined = worker => match joined {
            Ok(Ok(never)) => match never {},
            Ok(Err(e)) => Err(e),
            Err(e) => Err(CollectorError::Join(e.to_string())),
        },
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(CollectorError::Signal)?;
            tracing::info!(project = %project, "shutting down...");
            Ok(())
        }
    }
}

fn publish_descriptor(eff: &Effective) {
    if !eff.descriptor.enabled {
        return;
    }
    let descriptor = ProjectDescriptor::new(eff.project.clone(), eff.track.clone(), eff.languages.clone());
    let sink = LocalDescriptorSink::new(&eff.descriptor.dir);
    match sink.publish(&descriptor) {
        Ok(location) => tracing::info!(location = %location, "project descriptor written"),
        Err(e) => tracing::warn!(error = %e, "project descriptor not written, continuing"),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Ingest (blocking)
// ═══════════════════════════════════════════════════════════════

fn ingest(eff: Effective) -> Result<Infallible, CollectorError> {
    let stores = open_stores(&eff)?;
    let transport = build_transport(&eff)?;
    let credentials = credential_source(&eff)?;

    let listener = StreamListener::new(eff.project.clone(), &eff.runner, stores);
    let filter = StreamFilter::new(eff.track.clone(), eff.languages.clone());
    let mut runner = ResilientFeedRunner::new(transport, credentials, filter, listener, &eff.runner);
    Ok(runner.run()?)
}

fn open_stores(eff: &Effective) -> Result<PartitionStores, CollectorError> {
    if eff.dry_run {
        tracing::info!("dry run: events are kept in memory only");
        return Ok(PartitionStores::new(
            Arc::new(MemoryEventStore::new()),
            Arc::new(MemoryEventStore::new()),
        ));
    }

    let open = |partition: Partition| -> Result<Arc<dyn EventStore>, CollectorError> {
        let path = eff.storage.path_for(partition);
        let store = SqliteEventStore::open(&path, &eff.storage)?;
        tracing::info!(
            partition = %partition,
            label = partition.label(),
            path = %path.display(),
            rows = store.count()?,
            "partition ready"
        );
        Ok(Arc::new(store))
    };
    Ok(PartitionStores::new(open(Partition::Even)?, open(Partition::Odd)?))
}

fn build_transport(eff: &Effective) -> Result<Box<dyn FeedTransport>, CollectorError> {
    match eff.feed.transport {
        TransportKind::Http => Ok(Box::new(HttpStreamTransport::new(eff.feed.http())?)),
        TransportKind::File => Ok(Box::new(FileReplayTransport::new(eff.feed.file()?))),
    }
}

fn credential_source(eff: &Effective) -> Result<Box<dyn CredentialSource>, CollectorError> {
    match eff.feed.transport {
        TransportKind::File => Ok(Box::new(Credentials::default())),
        TransportKind::Http if eff.config_found => Ok(Box::new(FileCredentials::new(&eff.config_path))),
        TransportKind::Http => Err(CollectorError::Config(format!(
            "{} not found: [credentials] are required for transport = \"http\"",
            eff.config_path.display()
        ))),
    }
}
