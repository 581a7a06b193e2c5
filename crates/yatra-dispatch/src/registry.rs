//! # Provider Registry
//!
//! In-memory registry of service providers: what they drive, what
//! categories they serve, and whether they are currently taking work.
//! Eligibility selection for offer broadcast reads from here.
//!
//! All operations are synchronous (`parking_lot::RwLock`, never held
//! across an `.await`), and nothing in the registry ever locks a trip, so
//! registry reads are safe inside a trip guard.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use yatra_core::{ProviderId, Timestamp, TripCategory, VehicleClass};

/// A registered service provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Unique provider identifier.
    pub id: ProviderId,
    /// Display name.
    pub display_name: String,
    /// Vehicle classes this provider can serve.
    pub vehicle_classes: Vec<VehicleClass>,
    /// Trip categories this provider serves.
    pub categories: Vec<TripCategory>,
    /// Whether the provider is currently available for offers.
    pub available: bool,
    /// When the provider registered.
    pub registered_at: Timestamp,
}

/// Thread-safe, cloneable provider registry.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<HashMap<ProviderId, ProviderRecord>>>,
}

impl Clone for ProviderRegistry {
    fn clone(&self) -> Self {
        Self {
            providers: Arc::clone(&self.providers),
        }
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous registration.
    pub fn register(&self, record: ProviderRecord) {
        self.providers.write().insert(record.id, record);
    }

    /// Look up a provider.
    pub fn get(&self, id: ProviderId) -> Option<ProviderRecord> {
        self.providers.read().get(&id).cloned()
    }

    /// Set a provider's availability. Returns the updated record, or
    /// `None` for an unknown provider.
    pub fn set_available(&self, id: ProviderId, available: bool) -> Option<ProviderRecord> {
        let mut guard = self.providers.write();
        guard.get_mut(&id).map(|record| {
            record.available = available;
            record.clone()
        })
    }

    /// Providers eligible for a trip: available, serving the category,
    /// and operating the vehicle class. Broadcast order is unspecified —
    /// ranking is an external concern.
    pub fn eligible_for(&self, category: TripCategory, class: VehicleClass) -> Vec<ProviderId> {
        self.providers
            .read()
            .values()
            .filter(|p| {
                p.available && p.categories.contains(&category) && p.vehicle_classes.contains(&class)
            })
            .map(|p| p.id)
            .collect()
    }

    /// All registered providers.
    pub fn records(&self) -> Vec<ProviderRecord> {
        self.providers.read().values().cloned().collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(categories: Vec<TripCategory>, classes: Vec<VehicleClass>, available: bool) -> ProviderRecord {
        ProviderRecord {
            id: ProviderId::new(),
            display_name: "test provider".to_string(),
            vehicle_classes: classes,
            categories,
            available,
            registered_at: Timestamp::now(),
        }
    }

    #[test]
    fn eligible_matches_category_class_and_availability() {
        let registry = ProviderRegistry::new();
        let sedan_hire = provider(
            vec![TripCategory::DriverHire],
            vec![VehicleClass::Sedan],
            true,
        );
        let tow = provider(vec![TripCategory::Tow], vec![VehicleClass::Flatbed], true);
        let off_duty = provider(
            vec![TripCategory::DriverHire],
            vec![VehicleClass::Sedan],
            false,
        );
        registry.register(sedan_hire.clone());
        registry.register(tow);
        registry.register(off_duty);

        let eligible = registry.eligible_for(TripCategory::DriverHire, VehicleClass::Sedan);
        assert_eq!(eligible, vec![sedan_hire.id]);
    }

    #[test]
    fn eligible_is_empty_when_nothing_matches() {
        let registry = ProviderRegistry::new();
        registry.register(provider(
            vec![TripCategory::Tow],
            vec![VehicleClass::WheelLift],
            true,
        ));
        assert!(registry
            .eligible_for(TripCategory::Outstation, VehicleClass::Suv)
            .is_empty());
    }

    #[test]
    fn set_available_flips_eligibility() {
        let registry = ProviderRegistry::new();
        let p = provider(vec![TripCategory::Tow], vec![VehicleClass::Flatbed], true);
        let id = p.id;
        registry.register(p);

        assert_eq!(registry.eligible_for(TripCategory::Tow, VehicleClass::Flatbed).len(), 1);
        let updated = registry.set_available(id, false).unwrap();
        assert!(!updated.available);
        assert!(registry.eligible_for(TripCategory::Tow, VehicleClass::Flatbed).is_empty());
    }

    #[test]
    fn set_available_unknown_provider_is_none() {
        let registry = ProviderRegistry::new();
        assert!(registry.set_available(ProviderId::new(), true).is_none());
    }

    #[test]
    fn register_replaces_previous_record() {
        let registry = ProviderRegistry::new();
        let mut p = provider(vec![TripCategory::Tow], vec![VehicleClass::Flatbed], true);
        let id = p.id;
        registry.register(p.clone());

        p.display_name = "renamed".to_string();
        registry.register(p);
        assert_eq!(registry.get(id).unwrap().display_name, "renamed");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clone_shares_underlying_data() {
        let registry = ProviderRegistry::new();
        let clone = registry.clone();
        clone.register(provider(
            vec![TripCategory::DriverHire],
            vec![VehicleClass::Sedan],
            true,
        ));
        assert_eq!(registry.len(), 1);
    }
}
