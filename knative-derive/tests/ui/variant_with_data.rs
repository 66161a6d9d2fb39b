use knative_derive::ConditionType;

#[derive(ConditionType, Clone, Debug, PartialEq)]
enum AdapterCondition {
    Ready,
    Failed(String),
}

fn main() {
    for condition in [AdapterCondition::Ready, AdapterCondition::Failed(String::new())] {
        if let AdapterCondition::Failed(reason) = condition {
            println!("{reason}");
        }
    }
}
