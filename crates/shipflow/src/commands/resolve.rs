use shipflow_core::Registry;

pub fn handle(registry: &Registry, branch: &str) {
    let branch = shipflow_core::branch_from_ref(branch);
    println!("{}", shipflow_core::resolve(branch, &registry.branches));
}
