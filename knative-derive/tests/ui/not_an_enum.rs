use knative_derive::ConditionType;

#[derive(ConditionType)]
struct Ready {
    deployed: bool,
}

fn main() {
    let _ = Ready { deployed: true }.deployed;
}
