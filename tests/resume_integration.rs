//! Integration tests for crash-resume of full renders.
//!
//! Run with: `cargo test --test resume_integration`

mod common;

use std::sync::Arc;

use terratile::color::pack;
use terratile::config::RenderConfig;
use terratile::coord::RegionCoord;
use terratile::job::FullRenderJob;
use terratile::render::{FlatRenderer, Palette, Renderer, RendererSet};
use terratile::state::{ScanLedger, LEDGER_FILE};
use terratile::world::WorldSource;

use common::{MockWorld, STONE};
use tempfile::TempDir;

fn flat_renderers() -> Arc<RendererSet> {
    let palette = Arc::new(Palette::new().with_material(STONE, pack(255, 120, 120, 120)));
    let flat: Arc<dyn Renderer> = Arc::new(FlatRenderer::new(palette));
    Arc::new(RendererSet::new(vec![flat]).unwrap())
}

fn config(dir: &TempDir) -> RenderConfig {
    let mut config = RenderConfig::new(dir.path().join("tiles"), dir.path().join("state"));
    config.render_workers = 2;
    config
}

#[tokio::test]
async fn interrupted_full_render_resumes_remaining_regions_only() {
    let dir = TempDir::new().unwrap();
    let regions = vec![
        RegionCoord::new(0, 0),
        RegionCoord::new(1, 0),
        RegionCoord::new(0, -1),
        RegionCoord::new(-1, 1),
    ];

    // ledger left behind by a run that died after two regions
    let state_dir = dir.path().join("state");
    let mut ledger = ScanLedger::create(&state_dir, regions.clone());
    ledger.mark_done(RegionCoord::new(0, 0));
    ledger.mark_done(RegionCoord::new(1, 0));
    ledger.save().unwrap();

    let world = Arc::new(
        MockWorld::new(regions).with_column(0, 0, STONE, 64),
    );
    let source: Arc<dyn WorldSource> = world.clone();
    let job = FullRenderJob::new(config(&dir), source, flat_renderers()).unwrap();

    let summary = job.run().await.unwrap();

    // exactly the two pending regions were scanned
    assert_eq!(summary.rendered, 2);
    assert_eq!(world.snapshot_count(), 2);
    assert!(job.progress().snapshot().is_complete());

    // done regions were not re-rendered
    assert!(!dir.path().join("tiles/flat/z0/r.0.0.ttl").exists());
    assert!(dir.path().join("tiles/flat/z0/r.0.-1.ttl").exists());
    assert!(dir.path().join("tiles/flat/z0/r.-1.1.ttl").exists());

    // the ledger is gone once the job completes
    assert!(!state_dir.join(LEDGER_FILE).exists());
}

#[tokio::test]
async fn fresh_full_render_journals_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let regions = vec![RegionCoord::new(0, 0), RegionCoord::new(2, 2)];
    let world = Arc::new(
        MockWorld::new(regions).with_column(5, 5, STONE, 70),
    );
    let source: Arc<dyn WorldSource> = world.clone();

    let job = FullRenderJob::new(config(&dir), source, flat_renderers()).unwrap();
    let summary = job.run().await.unwrap();

    assert_eq!(summary.rendered, 2);
    assert!(!summary.cancelled);
    assert_eq!(world.snapshot_count(), 2);
    assert!(dir.path().join("tiles/flat/z0/r.0.0.ttl").exists());
    assert!(dir.path().join("tiles/flat/z0/r.2.2.ttl").exists());
    assert!(!dir.path().join("state").join(LEDGER_FILE).exists());

    // timestamps persisted for a later background processor
    assert!(dir.path().join("state/timestamps.json").exists());
}
