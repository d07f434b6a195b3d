use crate::output;
use shipflow_core::Registry;

pub fn handle(
    registry: &Registry,
    environment: &str,
    services: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let names: Vec<&str> = if services.is_empty() {
        registry.service_names().collect()
    } else {
        services.iter().map(String::as_str).collect()
    };

    let plans = names
        .into_iter()
        .map(|name| shipflow_core::plan_service(registry, name, environment))
        .collect::<shipflow_core::Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    for plan in &plans {
        output::print_plan(plan);
    }
    Ok(())
}
