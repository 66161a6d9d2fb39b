use knative_derive::ConditionType;

#[derive(ConditionType, Clone, Copy, Debug, PartialEq)]
enum JobCondition {
    Ready,
    Succeeded,
}

fn main() {
    let _ = [JobCondition::Ready, JobCondition::Succeeded];
}
