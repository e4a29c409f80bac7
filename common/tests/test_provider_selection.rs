// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::provider::{
    Accuracy, PowerUsage, ProviderDescriptor, ProviderId, select_best_provider,
};

fn providers() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor::new("network", Accuracy::Coarse, PowerUsage::Low),
        ProviderDescriptor::new("fused", Accuracy::Fine, PowerUsage::Medium),
        ProviderDescriptor::new("gps", Accuracy::Fine, PowerUsage::High),
    ]
}

fn selected(providers: &[ProviderDescriptor], accuracy: Accuracy, power: PowerUsage) -> Option<ProviderId> {
    select_best_provider(providers, accuracy, power).map(|d| d.id.clone())
}

#[test]
pub fn prefer_cheapest_fine_provider() {
    assert_eq!(
        selected(&providers(), Accuracy::Fine, PowerUsage::High),
        Some(ProviderId::new("fused"))
    );
}

#[test]
pub fn fine_provider_serves_coarse_request_within_budget() {
    assert_eq!(
        selected(&providers(), Accuracy::Coarse, PowerUsage::Medium),
        Some(ProviderId::new("fused"))
    );
}

#[test]
pub fn fine_request_is_never_relaxed() {
    let coarse_only = vec![ProviderDescriptor::new("network", Accuracy::Coarse, PowerUsage::Low)];
    assert_eq!(selected(&coarse_only, Accuracy::Fine, PowerUsage::High), None);
}

#[test]
pub fn coarse_request_relaxes_power_budget() {
    let gps_only = vec![ProviderDescriptor::new("gps", Accuracy::Fine, PowerUsage::High)];
    assert_eq!(
        selected(&gps_only, Accuracy::Coarse, PowerUsage::Low),
        Some(ProviderId::new("gps"))
    );
}

#[test]
pub fn nothing_selected_without_providers() {
    assert_eq!(selected(&[], Accuracy::Coarse, PowerUsage::Low), None);
    assert_eq!(selected(&[], Accuracy::Fine, PowerUsage::High), None);
}
