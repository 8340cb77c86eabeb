#![no_main]
use libfuzzer_sys::fuzz_target;
use turnstile_rs::Condition;

// Rule parsing must never panic, and accepted rules must uphold the
// exactly-one-separator grammar
fuzz_target!(|input: &[u8]| {
    let Ok(rule) = std::str::from_utf8(input) else {
        return;
    };

    match Condition::parse(rule) {
        Ok(cond) => {
            assert_eq!(cond.rule(), rule);
            assert_eq!(cond.rule().matches('=').count(), 1);
            assert!(!cond.key().contains('='));
            assert!(!cond.value().contains('='));
            assert_eq!(format!("{}={}", cond.key(), cond.value()), rule);
        }
        Err(_) => {
            assert_ne!(rule.matches('=').count(), 1);
        }
    }
});
