/// Stand-in used when the `federated` feature is disabled; there is no broker-base loop
/// or filter federate to run without it.
pub fn run_broker(_name: &str) -> anyhow::Result<()> {
    anyhow::bail!("enable the `federated` feature to run a broker")
}
