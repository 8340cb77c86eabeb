#![no_main]
use libfuzzer_sys::fuzz_target;
use turnstile_rs::Policy;

// Arbitrary documents must either parse into a valid policy or fail
// cleanly; accepted policies must survive a serialize/parse cycle
fuzz_target!(|input: &[u8]| {
    let Ok(json) = std::str::from_utf8(input) else {
        return;
    };

    let Ok(policy) = Policy::from_json(json) else {
        return;
    };

    assert_eq!(policy.subject_rule.rule().matches('=').count(), 1);
    assert_eq!(policy.resource_rule.rule().matches('=').count(), 1);

    let reserialized = policy.to_json().unwrap();
    let reparsed = Policy::from_json(&reserialized).unwrap();
    assert_eq!(reparsed, policy);
});
