use knative_derive::ConditionType;

#[derive(ConditionType, Clone, Copy, Debug, PartialEq)]
enum AdapterCondition {
    #[dependent]
    Ready,
    #[dependent]
    Deployed,
}

fn main() {
    let _ = [AdapterCondition::Ready, AdapterCondition::Deployed];
}
