use knative_derive::ConditionType;

#[derive(ConditionType, Clone, Copy, Debug, PartialEq)]
enum JobCondition {
    #[dependent]
    Scheduled,
}

fn main() {
    let _ = JobCondition::Scheduled;
}
