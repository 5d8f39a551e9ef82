// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state (spec §5 "Shared-resource policy"), aggregating
//! every component behind a single `Arc` the router and background tasks
//! clone cheaply. Shaped after the teacher's `MuxState` (config +
//! cancellation token + lock-guarded shared maps), rebuilt from scratch
//! rather than copied field-for-field — see DESIGN.md.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bridge::AgentEventBridge;
use crate::config::Config;
use crate::game_client::GameClientFactory;
use crate::lifecycle::{LifecycleSupervisor, MovementProfiles};
use crate::navigation::NavigationController;
use crate::perception::PerceptionSampler;
use crate::playback::PlaybackEngine;
use crate::skills::SkillRegistry;
use crate::sustainability::SustainabilityService;
use crate::telemetry::Instruments;

pub struct AppState<F: GameClientFactory + 'static> {
    pub config: Config,
    pub instruments: Instruments,
    pub lifecycle: Arc<LifecycleSupervisor<F>>,
    pub navigation: Arc<NavigationController<F>>,
    pub perception: Arc<PerceptionSampler>,
    pub playback: Arc<PlaybackEngine>,
    pub sustainability: Arc<SustainabilityService>,
    pub skills: Arc<SkillRegistry>,
    pub bridge: Arc<AgentEventBridge>,
    pub cancel: CancellationToken,
    next_client_id: AtomicU64,
}

impl<F: GameClientFactory + 'static> AppState<F> {
    pub fn new(
        config: Config,
        instruments: Instruments,
        factory: F,
        connect_options: crate::game_client::ConnectOptions,
        food_names: Vec<String>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let profiles = MovementProfiles::from_config(&config.navigation);
        let lifecycle =
            LifecycleSupervisor::new(factory, connect_options, config.game_server.reconnect_delay, profiles, cancel.clone());
        let navigation = Arc::new(NavigationController::new(lifecycle.clone(), &config.navigation));
        let perception = Arc::new(PerceptionSampler::new(config.perception.clone(), instruments.clone()));
        let playback = Arc::new(PlaybackEngine::new(&config.playback));
        let sustainability = Arc::new(SustainabilityService::new(Duration::from_secs(60), food_names));
        let skills = Arc::new(SkillRegistry::new(config.skill_history_path.clone()));
        let bridge = AgentEventBridge::new(&config.bridge, instruments.clone(), cancel.clone());

        Arc::new(Self {
            config,
            instruments,
            lifecycle,
            navigation,
            perception,
            playback,
            sustainability,
            skills,
            bridge,
            cancel,
            next_client_id: AtomicU64::new(1),
        })
    }

    /// Allocates a fresh opaque client id for a new inbound session (spec
    /// §4.3 "Assign a fresh opaque client id").
    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::SeqCst)
    }
}
