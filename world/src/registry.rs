//! Roster of everything that currently exists, used for nearest-of queries.

use spire_core::{AgentId, PickupId, TableId};

/// Single source of truth for which agents, pickups, and tables are live.
///
/// Membership is at-most-once: registering twice is a no-op, as is removing
/// an absent entry. Insertion order carries no meaning; every query that
/// cares about determinism sorts or scans by id.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    agents: Vec<AgentId>,
    pickups: Vec<PickupId>,
    tables: Vec<TableId>,
    player_present: bool,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live agent; reports whether the entry was newly added.
    pub fn register_agent(&mut self, agent: AgentId) -> bool {
        if self.agents.contains(&agent) {
            return false;
        }
        self.agents.push(agent);
        true
    }

    /// Unregisters an agent; a no-op when the id is absent.
    pub fn unregister_agent(&mut self, agent: AgentId) -> bool {
        match self.agents.iter().position(|id| *id == agent) {
            Some(index) => {
                let _ = self.agents.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Reports whether an agent is currently registered.
    #[must_use]
    pub fn contains_agent(&self, agent: AgentId) -> bool {
        self.agents.contains(&agent)
    }

    /// Number of live registered agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Registers a live pickup; reports whether the entry was newly added.
    pub fn register_pickup(&mut self, pickup: PickupId) -> bool {
        if self.pickups.contains(&pickup) {
            return false;
        }
        self.pickups.push(pickup);
        true
    }

    /// Unregisters a pickup; a no-op when the id is absent.
    pub fn unregister_pickup(&mut self, pickup: PickupId) -> bool {
        match self.pickups.iter().position(|id| *id == pickup) {
            Some(index) => {
                let _ = self.pickups.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of live registered pickups.
    #[must_use]
    pub fn pickup_count(&self) -> usize {
        self.pickups.len()
    }

    /// Registers a live table; reports whether the entry was newly added.
    pub fn register_table(&mut self, table: TableId) -> bool {
        if self.tables.contains(&table) {
            return false;
        }
        self.tables.push(table);
        true
    }

    /// Unregisters a table; a no-op when the id is absent.
    pub fn unregister_table(&mut self, table: TableId) -> bool {
        match self.tables.iter().position(|id| *id == table) {
            Some(index) => {
                let _ = self.tables.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of live registered tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Marks the single player entity as present.
    pub fn set_player_present(&mut self, present: bool) {
        self.player_present = present;
    }

    /// Reports whether the player entity is currently alive.
    #[must_use]
    pub fn player_present(&self) -> bool {
        self.player_present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_registration_leaves_size_unchanged() {
        let mut registry = Registry::new();
        let agent = AgentId::new(7);

        assert!(registry.register_agent(agent));
        assert!(!registry.register_agent(agent));
        assert_eq!(registry.agent_count(), 1);
    }

    #[test]
    fn unregistering_absent_entries_is_a_no_op() {
        let mut registry = Registry::new();

        assert!(!registry.unregister_agent(AgentId::new(3)));
        assert!(!registry.unregister_pickup(PickupId::new(3)));
        assert!(!registry.unregister_table(TableId::new(3)));
        assert_eq!(registry.agent_count(), 0);
    }

    #[test]
    fn registration_round_trips() {
        let mut registry = Registry::new();
        let pickup = PickupId::new(11);

        assert!(registry.register_pickup(pickup));
        assert!(registry.unregister_pickup(pickup));
        assert!(!registry.unregister_pickup(pickup));
        assert_eq!(registry.pickup_count(), 0);
    }

    #[test]
    fn player_presence_toggles() {
        let mut registry = Registry::new();
        assert!(!registry.player_present());
        registry.set_player_present(true);
        assert!(registry.player_present());
        registry.set_player_present(false);
        assert!(!registry.player_present());
    }
}
