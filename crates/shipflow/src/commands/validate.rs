use colored::Colorize;
use std::path::Path;

pub fn handle(explicit_root: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "レジストリを検証中...".blue());

    // プロジェクトルートを検出
    let project_root = match super::project_root(explicit_root) {
        Ok(root) => root,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ プロジェクトルートが見つかりません".red().bold());
            eprintln!("  {}", e);
            eprintln!();
            eprintln!("shipflow.kdl が存在するディレクトリで実行してください");
            std::process::exit(1);
        }
    };
    println!(
        "プロジェクトルート: {}",
        project_root.display().to_string().cyan()
    );

    let registry = match shipflow_core::load_project_from_root(&project_root) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ レジストリは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", registry.project.cyan());
    println!("  サービス: {}個", registry.services.len());
    for service in &registry.services {
        println!(
            "    - {} ({}, {})",
            service.name.cyan(),
            service.kind,
            service.path
        );
    }

    let environments = registry.environments();
    println!("  環境: {}個", environments.len());
    for env in environments {
        let overrides = registry.overrides_for(env).count();
        if overrides > 0 {
            println!("    - {} ({}個のオーバーライド)", env.cyan(), overrides);
        } else {
            println!("    - {}", env.cyan());
        }
    }

    println!("  ブランチルール: {}個", registry.branches.rules.len());
    for rule in &registry.branches.rules {
        println!("    - {} → {}", rule.pattern, rule.environment.cyan());
    }
    println!(
        "    - (default) → {}",
        registry.branches.default_environment.cyan()
    );

    Ok(())
}
