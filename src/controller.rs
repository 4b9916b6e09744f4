//! Entity list controller
//!
//! Owns the panel state, applies companion messages to it, redraws the list
//! after every mutation and turns taps into change requests.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::DeadboltConfig;
use crate::entity::{Entity, NextStateTable};
use crate::i18n::{self, Catalog};
use crate::message::{Inbound, Outbound, API_OK};
use crate::scheduler::{LockScheduler, LockTimerFired};
use crate::settings::{EntityName, SettingsRecord};
use crate::view::{ListView, Tile};

/// State requested on a lock that triggers the deadbolt simulation
const UNLOCK: &str = "unlock";
/// State shown once the deadbolt has thrown again
const LOCKING: &str = "locking";

/// Mutable panel state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Entities in arrival order
    pub entities: Vec<Entity>,
    pub settings: SettingsRecord,
    /// Whether the companion last reported a reachable API
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct DeadboltPolicy {
    pub enabled: bool,
    pub entity: String,
    pub interval: Duration,
    pub cancel_stale: bool,
}

impl DeadboltPolicy {
    pub fn from_config(config: &DeadboltConfig) -> Result<Self> {
        Ok(Self {
            enabled: config.enabled,
            entity: config.entity.clone(),
            interval: config.interval()?,
            cancel_stale: config.cancel_stale,
        })
    }

    fn triggers(&self, entity_id: &str, state: &str) -> bool {
        self.enabled && entity_id == self.entity && state == UNLOCK
    }
}

pub struct Controller<V: ListView> {
    state: AppState,
    view: V,
    catalog: Catalog,
    table: NextStateTable,
    deadbolt: DeadboltPolicy,
    scheduler: LockScheduler,
    outbox: mpsc::UnboundedSender<Outbound>,
}

impl<V: ListView> Controller<V> {
    /// Create a controller over `settings`.
    ///
    /// The returned receiver yields deferred lock transitions; feed them back
    /// through [`Controller::on_lock_timer`].
    pub fn new(
        settings: SettingsRecord,
        mut view: V,
        catalog: Catalog,
        deadbolt: DeadboltPolicy,
        outbox: mpsc::UnboundedSender<Outbound>,
    ) -> (Self, mpsc::UnboundedReceiver<LockTimerFired>) {
        let (scheduler, timers) = LockScheduler::new();
        view.set_status(&catalog.gettext(i18n::UNAVAILABLE));

        let controller = Self {
            state: AppState {
                settings,
                ..AppState::default()
            },
            view,
            catalog,
            table: NextStateTable::new(),
            deadbolt,
            scheduler,
            outbox,
        };
        (controller, timers)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.state.entities
    }

    #[cfg(test)]
    pub fn settings(&self) -> &SettingsRecord {
        &self.state.settings
    }

    #[cfg(test)]
    pub fn is_available(&self) -> bool {
        self.state.available
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Apply one message from the companion
    pub fn handle(&mut self, msg: Inbound) {
        log::debug!("Received: {msg:?}");

        match msg {
            Inbound::Clear => {
                self.state.entities.clear();
                self.state.settings.entities.clear();
                self.setup_list();
            }
            Inbound::Add { id, name, state } => {
                self.state.settings.entities.push(EntityName::new(id.clone()));
                self.state.entities.push(Entity::new(id, name, state));
                self.setup_list();
            }
            Inbound::Change { id, state } => self.change(&id, &state),
            Inbound::Api { value, name } => {
                if value == API_OK {
                    self.state.available = true;
                    self.view.set_status(&name);
                } else {
                    self.state.available = false;
                    self.view.set_status(&value);
                }
            }
            Inbound::Url { value } => {
                self.state.settings.url = value;
                self.send_data(Outbound::Url {
                    value: self.state.settings.url.clone(),
                });
            }
            Inbound::Port { value } => {
                self.state.settings.port = value;
                self.send_data(Outbound::Port {
                    value: self.state.settings.port.clone(),
                });
            }
            Inbound::Token { value } => {
                self.state.settings.token = value;
                self.send_data(Outbound::Token {
                    value: self.state.settings.token.clone(),
                });
            }
            Inbound::Force { value } => {
                self.state.settings.force = value;
                self.send_data(Outbound::Force {
                    value: self.state.settings.force,
                });
            }
            Inbound::Unknown => log::debug!("Ignoring message with unknown key"),
        }
    }

    fn change(&mut self, id: &str, state: &str) {
        if self.deadbolt.cancel_stale {
            self.scheduler.cancel(id);
        }

        let mut matched = false;
        for entity in self.state.entities.iter_mut().filter(|e| e.id == id) {
            entity.state = state.to_string();
            matched = true;
        }
        if !matched {
            log::debug!("No entity {id} to update");
            return;
        }

        log::debug!("Updated: {id} to {state}");
        self.setup_list();

        if self.deadbolt.triggers(id, state) {
            self.scheduler.schedule(id, self.deadbolt.interval);
        }
    }

    /// Apply a deferred lock transition whose delay has elapsed
    pub fn on_lock_timer(&mut self, fired: LockTimerFired) {
        let mut matched = false;
        for entity in self
            .state
            .entities
            .iter_mut()
            .filter(|e| e.id == fired.entity_id)
        {
            entity.state = LOCKING.to_string();
            matched = true;
        }

        if matched {
            self.setup_list();
        } else {
            log::debug!("Lock {} is gone, dropping transition", fired.entity_id);
        }
    }

    /// Push the full known configuration to a freshly connected companion
    pub fn on_open(&mut self) {
        log::info!("Socket open");
        let settings = &self.state.settings;
        let handshake = [
            Outbound::Url {
                value: settings.url.clone(),
            },
            Outbound::Port {
                value: settings.port.clone(),
            },
            Outbound::Token {
                value: settings.token.clone(),
            },
            Outbound::Entities {
                value: settings.entities.clone(),
            },
            Outbound::Force {
                value: settings.force,
            },
        ];
        for msg in handshake {
            self.send_data(msg);
        }
    }

    /// Activate the control of row `index`. Returns whether a request was sent.
    pub fn tap(&mut self, index: usize) -> bool {
        let Some(entity) = self.state.entities.get(index) else {
            log::warn!("No entity at row {}", index + 1);
            return false;
        };

        // Unmapped states have no action to request
        let Some(action) = self.table.next_action(&entity.state) else {
            log::debug!("No action for {} in state {}", entity.id, entity.state);
            return false;
        };

        let msg = Outbound::Change {
            entity: entity.id.clone(),
            state: action.to_string(),
        };
        self.send_data(msg);
        true
    }

    /// Hand the settings record back for persisting
    pub fn into_settings(mut self) -> SettingsRecord {
        self.scheduler.cancel_all();
        self.state.settings
    }

    fn setup_list(&mut self) {
        let tiles: Vec<Tile> = self
            .state
            .entities
            .iter()
            .enumerate()
            .map(|(index, entity)| Tile {
                index,
                name: entity.name.clone(),
                label: self.catalog.gettext(&entity.state),
            })
            .collect();
        self.view.render(&tiles);
    }

    fn send_data(&self, msg: Outbound) {
        log::debug!("Sending {}", msg.key());
        if self.outbox.send(msg).is_err() {
            log::warn!("Transport is gone, dropping outbound message");
        }
    }
}
