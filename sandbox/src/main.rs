// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Khora Sandbox
// Issues overlapping loads and prints what the engine did with them.
//
// Usage: sandbox [config.ron]

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use khora_core::asset::{Fingerprint, Resource};
use khora_core::loading::{LoadError, ResourceCallback};
use khora_data::allocators::ResourcePool;
use khora_jobs::{EngineConfig, LoadEngine, ThreadDispatcher, LOADING_NAMESPACE};

/// A consumer that reports each outcome and releases what it receives.
struct Viewer {
    name: String,
    done: Mutex<mpsc::Sender<String>>,
}

impl ResourceCallback<Vec<u8>> for Viewer {
    fn on_resource_ready(&self, resource: Resource<Vec<u8>>) {
        let size = resource.with(|bytes| bytes.len()).unwrap_or(0);
        if let Err(e) = resource.release() {
            log::error!("{} failed to release its resource: {e}", self.name);
        }
        self.report(format!("{} received {size} bytes", self.name));
    }

    fn on_exception(&self, error: &LoadError) {
        self.report(format!("{} failed: {error}", self.name));
    }
}

impl Viewer {
    fn report(&self, line: String) {
        if let Ok(done) = self.done.lock() {
            let _ = done.send(line);
        }
    }
}

/// Pretends to decode `source`, slowly enough for requests to overlap.
fn decode(source: &'static str) -> impl FnOnce(&ResourcePool<Vec<u8>>) -> Result<Vec<u8>> + Send + 'static {
    move |pool: &ResourcePool<Vec<u8>>| {
        thread::sleep(Duration::from_millis(50));
        if source.ends_with(".bad") {
            anyhow::bail!("'{source}' is not a supported format");
        }
        let mut buffer = pool.take().unwrap_or_default();
        buffer.clear();
        buffer.resize(source.len() * 1024, 0xAB);
        Ok(buffer)
    }
}

fn main() -> Result<()> {
    khora_telemetry::logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };
    log::info!("Starting sandbox with {config:?}");

    let dispatcher = Arc::new(ThreadDispatcher::spawn(config.dispatcher_thread_name.clone())?);
    let engine: LoadEngine<Fingerprint, Vec<u8>> = LoadEngine::new(config, dispatcher.clone())?;
    let (done, reports) = mpsc::channel();

    let requests = [
        ("hud", "textures/atlas.png", true),
        ("minimap", "textures/atlas.png", true),
        ("terrain", "textures/ground.png", true),
        ("preview", "textures/ground.png", false),
        ("editor", "textures/broken.bad", true),
    ];

    let mut expected = 0;
    for (name, source, cacheable) in requests {
        let viewer = Arc::new(Viewer {
            name: name.to_string(),
            done: Mutex::new(done.clone()),
        });
        let status = engine.load(Fingerprint::of_source(source), viewer, cacheable, decode(source))?;
        log::info!("{name}: requested {source} (cached: {})", status.is_cached());
        expected += 1;
    }

    for line in reports.iter().take(expected) {
        println!("{line}");
    }

    // A second wave finds the cacheable results already decoded.
    let viewer = Arc::new(Viewer {
        name: "hud-reopened".to_string(),
        done: Mutex::new(done.clone()),
    });
    let status = engine.load(
        Fingerprint::of_source("textures/atlas.png"),
        viewer,
        true,
        decode("textures/atlas.png"),
    )?;
    log::info!("hud-reopened: cached = {}", status.is_cached());
    if let Some(line) = reports.iter().next() {
        println!("{line}");
    }

    engine.shutdown();
    dispatcher.shutdown();

    if let Some(registry) = engine.metrics_registry() {
        println!("--- {LOADING_NAMESPACE} metrics ---");
        for metric in registry.get_namespace_metrics(LOADING_NAMESPACE) {
            println!("{:<32} {:?}", metric.id.to_string(), metric.value);
        }
    }
    println!(
        "pool: {} payload(s) waiting, {} recycled",
        engine.pool().len(),
        engine.pool().recycled_total()
    );
    Ok(())
}
