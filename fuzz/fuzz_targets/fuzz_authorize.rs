#![no_main]
use libfuzzer_sys::{
    arbitrary::{Arbitrary, Unstructured},
    fuzz_target,
};
use turnstile_rs::{AttrValue, Attributes, Effect, Turnstile};

#[derive(Debug, Arbitrary)]
struct FuzzPolicy {
    name: String,
    allow: bool,
    subject_rule: String,
    resource_rule: String,
    action: String,
}

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<FuzzValue> for AttrValue {
    fn from(v: FuzzValue) -> Self {
        match v {
            FuzzValue::Bool(b) => AttrValue::Bool(b),
            FuzzValue::Int(i) => AttrValue::Int(i),
            FuzzValue::Float(f) => AttrValue::Float(f),
            FuzzValue::Text(s) => AttrValue::String(s),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzRequest {
    subject: Vec<(String, FuzzValue)>,
    resource: Vec<(String, FuzzValue)>,
    action: String,
}

// Policy creation and evaluation must never panic, whatever the inputs;
// evaluation must never report an error for well-formed stores
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let policies: Vec<FuzzPolicy> = match u.arbitrary() {
        Ok(p) => p,
        Err(_) => return,
    };
    let requests: Vec<FuzzRequest> = match u.arbitrary() {
        Ok(r) => r,
        Err(_) => return,
    };

    let turnstile = Turnstile::in_memory();

    for p in policies.iter().take(16) {
        let effect = if p.allow { Effect::Allow } else { Effect::Deny };
        // Malformed rules and duplicate names are expected failures
        let _ = turnstile.create_policy(&p.name, effect, &p.subject_rule, &p.resource_rule, &p.action);
    }

    for r in requests.into_iter().take(16) {
        let subject: Attributes = r.subject.into_iter().collect();
        let resource: Attributes = r.resource.into_iter().collect();
        turnstile
            .authorize(&subject, &resource, &r.action)
            .unwrap();
    }
});
