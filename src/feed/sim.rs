//! Simulated AIS fleet
//!
//! Produces the same normalized message stream as the live source without
//! network access. Ships advance along their course every tick; two scripted
//! behaviours exercise the detectors end to end: one tanker goes silent
//! mid-transit, and two others rendezvous and hold station together. The
//! detectors discover both from the message stream alone, the simulator
//! never emits incidents itself.

use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::Rng;
use tracing::info;

use super::{FeedError, FeedEvent, FeedSource};
use crate::config::defaults::{SIM_KNOTS_TO_DEG_PER_SEC, SIM_TICK_SECS};
use crate::types::{BoundingBox, FeedMessage};

struct SimShip {
    mmsi: u32,
    name: &'static str,
    lat: f64,
    lon: f64,
    sog: f64,
    cog: f64,
    /// AIS numeric ship-type code
    ship_type: u32,
    transmitting: bool,
}

impl SimShip {
    const fn new(
        mmsi: u32,
        name: &'static str,
        lat: f64,
        lon: f64,
        cog: f64,
        sog: f64,
        ship_type: u32,
    ) -> Self {
        Self {
            mmsi,
            name,
            lat,
            lon,
            sog,
            cog,
            ship_type,
            transmitting: true,
        }
    }
}

fn demo_fleet() -> Vec<SimShip> {
    vec![
        // Strait of Hormuz traffic
        SimShip::new(311_000_001, "GULF PIONEER", 26.4, 56.5, 120.0, 11.0, 80),
        SimShip::new(311_000_002, "HORMUZ TRADER", 26.2, 57.1, 300.0, 9.5, 80),
        SimShip::new(311_000_003, "PERSIAN STAR", 25.5, 58.0, 270.0, 13.0, 80),
        SimShip::new(311_000_004, "FALCON SPIRIT", 26.5, 56.8, 90.0, 7.5, 70),
        SimShip::new(311_000_005, "ARABIAN CROWN", 25.0, 58.5, 280.0, 10.0, 80),
        // Black Sea traffic
        SimShip::new(212_000_001, "BLACK SEA VENTURE", 43.0, 31.5, 50.0, 12.0, 70),
        SimShip::new(212_000_002, "ODESSA SPIRIT", 44.5, 33.0, 220.0, 8.5, 80),
        SimShip::new(212_000_003, "BOSPHORUS KING", 42.0, 29.5, 45.0, 14.0, 71),
        SimShip::new(212_000_004, "DANUBE DREAM", 44.0, 32.0, 180.0, 7.0, 70),
        // Red Sea traffic
        SimShip::new(538_000_001, "SUEZ EXPRESS", 27.0, 33.5, 160.0, 15.0, 71),
        SimShip::new(538_000_002, "RED SEA GLORY", 20.5, 38.2, 350.0, 11.0, 80),
        SimShip::new(538_000_003, "ADEN CARRIER", 14.0, 42.5, 170.0, 9.0, 70),
        // Background traffic outside the monitored zones
        SimShip::new(636_000_001, "ATLANTIC HORIZON", 35.0, -10.0, 75.0, 16.0, 71),
        SimShip::new(636_000_002, "PACIFIC STAR", 20.0, 120.0, 280.0, 14.5, 71),
        SimShip::new(636_000_003, "CAPE GLORY", -35.0, 14.0, 90.0, 12.0, 70),
        SimShip::new(636_000_004, "NORTHERN SPIRIT", 55.0, 0.0, 200.0, 10.0, 80),
        SimShip::new(636_000_005, "MEDITERRANEAN SUN", 38.0, 18.0, 135.0, 13.0, 70),
    ]
}

/// The tanker that goes silent mid-transit.
const SILENT_SHIP_MMSI: u32 = 311_000_003;
/// The pair that rendezvous for a simulated STS transfer.
const RENDEZVOUS_PAIR: (u32, u32) = (311_000_001, 311_000_002);

/// Tick at which PERSIAN STAR stops transmitting.
const DEFAULT_SILENCE_TICK: u64 = 12;
/// Tick at which the rendezvous pair closes up and holds station.
const DEFAULT_RENDEZVOUS_TICK: u64 = 24;

/// Scripted demo fleet implementing [`FeedSource`].
pub struct SimulatedFeed {
    ships: Vec<SimShip>,
    pending: VecDeque<FeedMessage>,
    tick: u64,
    tick_interval: tokio::time::Duration,
    silence_tick: u64,
    rendezvous_tick: u64,
    subscribed: bool,
}

impl SimulatedFeed {
    pub fn new() -> Self {
        Self {
            ships: demo_fleet(),
            pending: VecDeque::new(),
            tick: 0,
            tick_interval: tokio::time::Duration::from_secs(SIM_TICK_SECS),
            silence_tick: DEFAULT_SILENCE_TICK,
            rendezvous_tick: DEFAULT_RENDEZVOUS_TICK,
            subscribed: false,
        }
    }

    /// Override the wall-clock tick interval (tests use a short one).
    pub fn with_tick_interval(mut self, interval: tokio::time::Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Advance all transmitting ships one tick and queue position reports.
    fn advance(&mut self) {
        self.tick += 1;
        self.apply_scripts();

        let mut rng = rand::thread_rng();
        let dt = SIM_TICK_SECS as f64;
        for ship in &mut self.ships {
            if !ship.transmitting {
                continue;
            }
            let speed_deg_per_sec = ship.sog * SIM_KNOTS_TO_DEG_PER_SEC;
            let cog_rad = ship.cog * PI / 180.0;
            let dlat = speed_deg_per_sec * dt * cog_rad.cos();
            let dlon =
                speed_deg_per_sec * dt * cog_rad.sin() / ((ship.lat + 0.001) * PI / 180.0).cos();
            ship.lat += dlat + rng.gen_range(-0.0002..0.0002);
            ship.lon += dlon + rng.gen_range(-0.0002..0.0002);
            ship.cog = (ship.cog + rng.gen_range(-1.5..1.5)).rem_euclid(360.0);

            self.pending.push_back(FeedMessage::Position {
                vessel_id: ship.mmsi,
                lat: ship.lat,
                lon: ship.lon,
                sog: ship.sog,
                cog: ship.cog,
                name: None,
            });
        }
    }

    fn apply_scripts(&mut self) {
        if self.tick == self.silence_tick {
            if let Some(ship) = self.ships.iter_mut().find(|s| s.mmsi == SILENT_SHIP_MMSI) {
                ship.transmitting = false;
                info!(mmsi = ship.mmsi, name = ship.name, "sim: ship went silent");
            }
        }
        if self.tick == self.rendezvous_tick {
            let anchor = self
                .ships
                .iter()
                .find(|s| s.mmsi == RENDEZVOUS_PAIR.0)
                .map(|s| (s.lat, s.lon, s.cog));
            if let (Some((lat, lon, cog)), Some(partner)) = (
                anchor,
                self.ships.iter_mut().find(|s| s.mmsi == RENDEZVOUS_PAIR.1),
            ) {
                // Position the partner ~0.2 NM off and hold both at bare
                // steerage so the pair stays within the proximity threshold
                partner.lat = lat + 0.003;
                partner.lon = lon;
                partner.cog = cog;
                partner.sog = 0.3;
                info!(mmsi = partner.mmsi, name = partner.name, "sim: rendezvous started");
            }
            if let Some(anchor) = self.ships.iter_mut().find(|s| s.mmsi == RENDEZVOUS_PAIR.0) {
                anchor.sog = 0.3;
            }
        }
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FeedSource for SimulatedFeed {
    async fn subscribe(&mut self, _boxes: &[BoundingBox]) -> Result<(), FeedError> {
        // No upstream filter; queue static reports once so identity
        // resolution is exercised before the first positions arrive.
        if !self.subscribed {
            for ship in &self.ships {
                self.pending.push_back(FeedMessage::Static {
                    vessel_id: ship.mmsi,
                    name: Some(ship.name.to_string()),
                    ship_type: Some(ship.ship_type),
                });
            }
            self.subscribed = true;
        }
        Ok(())
    }

    async fn next_message(&mut self) -> Result<FeedEvent, FeedError> {
        if !self.subscribed {
            return Err(FeedError::NotSubscribed);
        }
        while self.pending.is_empty() {
            tokio::time::sleep(self.tick_interval).await;
            self.advance();
        }
        // Queue is non-empty here
        match self.pending.pop_front() {
            Some(message) => Ok(FeedEvent::Message(message)),
            None => Ok(FeedEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "sim"
    }
}
