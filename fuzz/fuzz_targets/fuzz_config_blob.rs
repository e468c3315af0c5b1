//! Fuzz target: stored config / genome decoding
//!
//! Arbitrary bytes in the NVS slots must decode to an error or to a
//! record that sanitizes into range, never a panic.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use ember::adapters::nvs::{CONFIG_KEY, GENOME_KEY, NAMESPACE, NvsAdapter};
use ember::app::ports::{ConfigPort, GenomePort, StoragePort};
use ember::genome::{BASE_SPEED_RANGE, LIGHT_THRESHOLD_RANGE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    let _ = nvs.write(NAMESPACE, CONFIG_KEY, data);
    let _ = nvs.write(NAMESPACE, GENOME_KEY, data);

    if let Ok(cfg) = nvs.load() {
        assert!(cfg.warn_distance_cm >= cfg.stop_distance_cm);
        assert!(cfg.ramp_step >= 1);
    }
    if let Ok(Some(g)) = nvs.load_genome() {
        let g = g.clamped();
        assert!(g.base_speed >= BASE_SPEED_RANGE.0);
        assert!((LIGHT_THRESHOLD_RANGE.0..=LIGHT_THRESHOLD_RANGE.1).contains(&g.light_threshold));
    }
});
