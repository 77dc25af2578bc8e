#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse, fail validation, or resolve
    // to a usable profile; never panic.
    let Ok(cfg) = blinds_config::load_toml(data) else {
        return;
    };
    let _ = cfg.validate();
    let profile = blinds_core::DeviceProfile::from(&cfg.device);
    assert!(profile.travel.duration_s() > 0);
    assert!(profile.travel.min_position() <= 0.0);
    assert_ne!(profile.tokens.open, profile.tokens.close);
    assert_ne!(profile.dps.action, profile.dps.percent_state);
});
