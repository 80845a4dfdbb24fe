//! LiveMapService – one reconciler per category group, the map layer they
//! draw on, and the player panel derived from the player set.

use crate::coords::CoordinateMapper;
use crate::engine::{CategoryProfile, PassReport, Reconciler};
use crate::layer::{MapLayer, SceneLayer};
use crate::protocol::Snapshot;
use crate::types::{CategoryGroup, Entity, LiveMapConfig, LiveMapStats, MapPoint};
use crate::view::{MapViewport, PanelChange, PanelRow, PlayerPanel, Summary};
use log::{debug, info, warn};

// ---------------------------------------------------------------------------
// Poll outcome
// ---------------------------------------------------------------------------

/// What happened to one poll result handed to [`LiveMapService::apply_poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The snapshot was reconciled.
    Applied(PassReport),
    /// No snapshot this round; previous state kept.
    Failed,
    /// Player updates are paused; nothing was touched.
    Paused,
}

pub struct LiveMapService<L: MapLayer = SceneLayer> {
    config: LiveMapConfig,
    players: Reconciler,
    npcs: Reconciler,
    garages: Reconciler,
    layer: L,
    panel: PlayerPanel,
    viewport: MapViewport,
    paused: bool,
    passes_applied: u64,
    failed_polls: u64,
    paused_ticks: u64,
}

impl LiveMapService<SceneLayer> {
    pub fn new(config: LiveMapConfig) -> Self {
        Self::with_layer(config, SceneLayer::new())
    }
}

impl<L: MapLayer> LiveMapService<L> {
    pub fn with_layer(config: LiveMapConfig, layer: L) -> Self {
        let mapper = CoordinateMapper::new(config.bounds);
        let engine = |group| {
            Reconciler::new(
                CategoryProfile::for_group(group),
                mapper,
                config.label_offset,
            )
        };
        Self {
            players: engine(CategoryGroup::Players),
            npcs: engine(CategoryGroup::Npcs),
            garages: engine(CategoryGroup::Garages),
            layer,
            panel: PlayerPanel::new(config.debug_mode),
            viewport: MapViewport::default(),
            paused: config.start_paused,
            passes_applied: 0,
            failed_polls: 0,
            paused_ticks: 0,
            config,
        }
    }

    pub fn config(&self) -> &LiveMapConfig {
        &self.config
    }

    pub fn engine(&self, group: CategoryGroup) -> &Reconciler {
        match group {
            CategoryGroup::Players => &self.players,
            CategoryGroup::Npcs => &self.npcs,
            CategoryGroup::Garages => &self.garages,
        }
    }

    /// The group's reconciler together with the layer it draws on.
    fn engine_and_layer(&mut self, group: CategoryGroup) -> (&mut Reconciler, &mut L) {
        let engine = match group {
            CategoryGroup::Players => &mut self.players,
            CategoryGroup::Npcs => &mut self.npcs,
            CategoryGroup::Garages => &mut self.garages,
        };
        (engine, &mut self.layer)
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    // -----------------------------------------------------------------------
    // Poll results
    // -----------------------------------------------------------------------

    /// Apply one poll result for `group`.
    ///
    /// A failed poll leaves the rendered set untouched; for players the panel
    /// is still re-derived from that unchanged set.
    pub fn apply_poll<E: std::fmt::Display>(
        &mut self,
        group: CategoryGroup,
        result: Result<Snapshot, E>,
    ) -> PollOutcome {
        if group == CategoryGroup::Players && self.paused {
            self.paused_ticks += 1;
            return PollOutcome::Paused;
        }

        let outcome = match result {
            Ok(snapshot) => {
                let (engine, layer) = self.engine_and_layer(group);
                let report = engine.reconcile(&snapshot, layer);
                if report.changed_membership() {
                    debug!(
                        "{group}: +{} -{} ({} rendered)",
                        report.created.len(),
                        report.removed.len(),
                        engine.rendered().len()
                    );
                }
                self.passes_applied += 1;
                PollOutcome::Applied(report)
            }
            Err(e) => {
                warn!("No {group} snapshot this round: {e}");
                self.failed_polls += 1;
                PollOutcome::Failed
            }
        };

        if group == CategoryGroup::Players {
            self.panel.refresh(self.players.rendered());
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Run / pause
    // -----------------------------------------------------------------------

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            info!(
                "Player updates {}",
                if paused { "paused" } else { "resumed" }
            );
        }
        self.paused = paused;
    }

    /// Flip the run/pause toggle; returns the new paused state.
    pub fn toggle_paused(&mut self) -> bool {
        self.set_paused(!self.paused);
        self.paused
    }

    // -----------------------------------------------------------------------
    // Panel
    // -----------------------------------------------------------------------

    pub fn summary(&self) -> Summary {
        self.panel.summary()
    }

    pub fn panel_rows(&self) -> &[PanelRow] {
        self.panel.rows()
    }

    pub fn search_query(&self) -> &str {
        self.panel.query()
    }

    pub fn set_search_query(&mut self, query: &str) -> Vec<PanelChange> {
        self.panel.set_query(query, self.players.rendered())
    }

    /// Panel row click: center on the player's marker, keeping zoom.
    pub fn select_player(&mut self, id: &str) -> Option<MapPoint> {
        let at = self.players.position_of(id)?;
        self.viewport.center_on(at);
        Some(at)
    }

    pub fn viewport(&self) -> &MapViewport {
        &self.viewport
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.viewport.set_zoom(zoom);
    }

    // -----------------------------------------------------------------------
    // Map interaction
    // -----------------------------------------------------------------------

    pub fn popup_opened(&mut self, group: CategoryGroup, id: &str) {
        let (engine, layer) = self.engine_and_layer(group);
        engine.popup_opened(id, layer);
    }

    pub fn popup_closed(&mut self, group: CategoryGroup, id: &str) {
        let (engine, layer) = self.engine_and_layer(group);
        engine.popup_closed(id, layer);
    }

    pub fn set_overlay_visible(&mut self, group: CategoryGroup, visible: bool) {
        self.layer.set_group_visible(group, visible);
    }

    // -----------------------------------------------------------------------
    // Debug dots
    // -----------------------------------------------------------------------

    /// Inject an entity outside the poll flow. It stays until [`Self::clear_dot`].
    pub fn new_dot(&mut self, entity: &Entity) -> bool {
        let group = entity.category.group();
        let (engine, layer) = self.engine_and_layer(group);
        let placed = engine.inject_debug(entity, layer);
        if placed && group == CategoryGroup::Players {
            self.panel.refresh(self.players.rendered());
        }
        placed
    }

    /// Move an existing debug dot. Ids that are not debug dots are left alone.
    pub fn update_dot(&mut self, entity: &Entity) -> bool {
        if !self.engine(entity.category.group()).is_debug(&entity.id) {
            return false;
        }
        self.new_dot(entity)
    }

    pub fn clear_dot(&mut self, group: CategoryGroup, id: &str) -> bool {
        let (engine, layer) = self.engine_and_layer(group);
        let cleared = engine.clear_debug(id, layer);
        if cleared && group == CategoryGroup::Players {
            self.panel.refresh(self.players.rendered());
        }
        cleared
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> LiveMapStats {
        LiveMapStats {
            players: self.players.rendered().len(),
            npcs: self.npcs.rendered().len(),
            garages: self.garages.rendered().len(),
            passes_applied: self.passes_applied,
            failed_polls: self.failed_polls,
            paused_ticks: self.paused_ticks,
        }
    }
}
