use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use launch_bundler::{
    arguments::{set_cmd_args, split_logging_flags},
    config::{Configs, CONFIG_FILE_PATH},
    errors::{BundlerError, BundlerResult},
    instructions::Direction,
    logger::{self, LogTag},
    operations::{
        DistributeWsolParams, FundWorkersParams, LaunchContext, OperationReport,
        PoolBundleParams, SellPercentageParams, TipOnly,
    },
    utils::{lamports_to_sol, short_address, sol_to_lamports, ui_to_raw_amount},
    wallets::create_keypairs,
};
use solana_sdk::pubkey::Pubkey;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

fn tip_arg() -> Arg {
    Arg::new("tip")
        .long("tip")
        .value_name("SOL")
        .help("Relay tip in SOL (defaults to bundle.default_tip_sol)")
}

fn cli() -> Command {
    Command::new("launch-bundler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds and submits launch bundles across a pool of worker wallets")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .default_value(CONFIG_FILE_PATH)
                .help("Path to configs.json"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Build and simulate bundles without submitting them"),
        )
        .subcommand(
            Command::new("create-keypairs")
                .about("Generate worker keypairs into the keystore")
                .arg(
                    Arg::new("count")
                        .long("count")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("27"),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Overwrite an existing keystore"),
                ),
        )
        .subcommand(Command::new("checklist").about("Show launch readiness"))
        .subcommand(Command::new("create-lut").about("Create the launch lookup table").arg(tip_arg()))
        .subcommand(Command::new("extend-lut").about("Register launch addresses in the lookup table").arg(tip_arg()))
        .subcommand(
            Command::new("fund-workers")
                .about("Send SOL and create base-token accounts for every worker")
                .arg(Arg::new("sol").long("sol").required(true).help("SOL per worker"))
                .arg(tip_arg()),
        )
        .subcommand(
            Command::new("distribute-wsol")
                .about("Wrap step * (i + 1) SOL into worker i's WSOL account")
                .arg(Arg::new("step").long("step").required(true).help("Step in SOL"))
                .arg(tip_arg()),
        )
        .subcommand(Command::new("close-wsol").about("Close worker WSOL accounts").arg(tip_arg()))
        .subcommand(
            Command::new("create-pool")
                .about("Create the pool and buy from every worker in one bundle")
                .arg(Arg::new("market").long("market").required(true))
                .arg(Arg::new("base-amount").long("base-amount").required(true).help("Base tokens (UI units)"))
                .arg(Arg::new("quote-sol").long("quote-sol").required(true).help("SOL deposited"))
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("delay")
                        .long("delay")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0")
                        .help("Seconds between cycles"),
                )
                .arg(tip_arg()),
        )
        .subcommand(
            Command::new("buy")
                .about("Buy from every worker holding WSOL in one bundle")
                .arg(tip_arg()),
        )
        .subcommand(Command::new("sell-all").about("Sell every worker's base balance").arg(tip_arg()))
        .subcommand(
            Command::new("sell-percentage")
                .about("Consolidate a share of worker balances and sell from the fee payer")
                .arg(Arg::new("percent").long("percent").required(true))
                .arg(
                    Arg::new("sequence")
                        .long("sequence")
                        .default_value("sell")
                        .help("Comma separated swaps, e.g. sell,buy,sell"),
                )
                .arg(Arg::new("buy-sol").long("buy-sol").default_value("0"))
                .arg(tip_arg()),
        )
        .subcommand(Command::new("remove-liquidity").about("Withdraw the full LP position").arg(tip_arg()))
}

/// Keypairs can be generated on a fresh checkout before configs.json exists.
fn load_configs(path: &str, subcommand: Option<&str>) -> BundlerResult<Configs> {
    if subcommand == Some("create-keypairs") && !std::path::Path::new(path).exists() {
        logger::info(
            LogTag::System,
            &format!("{} not found, using default paths", path),
        );
        return Ok(Configs::default());
    }
    Configs::load(path)
}

#[tokio::main]
async fn main() {
    let (cli_args, _) = split_logging_flags(std::env::args().collect());
    set_cmd_args(std::env::args().collect());
    logger::init();

    let matches = cli().get_matches_from(cli_args);
    let config_path = matches
        .get_one::<String>("config")
        .cloned()
        .unwrap_or_else(|| CONFIG_FILE_PATH.to_string());

    let configs = load_configs(&config_path, matches.subcommand_name());
    let configs = match configs {
        Ok(configs) => configs,
        Err(e) => {
            logger::error(LogTag::System, &e.to_string());
            logger::flush();
            std::process::exit(1);
        }
    };

    let result = match matches.subcommand() {
        Some((name, sub)) => run_subcommand(&configs, name, sub).await,
        None => run_menu(&configs).await,
    };

    logger::flush();
    if let Err(e) = result {
        logger::error(LogTag::System, &format!("{:#}", e));
        logger::flush();
        std::process::exit(1);
    }
}

fn parse_sol(value: &str) -> Result<u64> {
    let sol: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a SOL amount", value))?;
    if sol < 0.0 {
        return Err(anyhow!("SOL amounts cannot be negative"));
    }
    Ok(sol_to_lamports(sol))
}

fn parse_sequence(value: &str) -> Result<Vec<Direction>> {
    value
        .split(',')
        .map(|step| match step.trim().to_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            other => Err(anyhow!("unknown swap '{}', expected buy or sell", other)),
        })
        .collect()
}

fn tip_from(configs: &Configs, sub: &ArgMatches) -> Result<u64> {
    match sub.get_one::<String>("tip") {
        Some(value) => parse_sol(value),
        None => Ok(sol_to_lamports(configs.bundle.default_tip_sol)),
    }
}

fn required<'a>(sub: &'a ArgMatches, name: &str) -> Result<&'a String> {
    sub.get_one::<String>(name)
        .ok_or_else(|| anyhow!("--{} is required", name))
}

async fn run_subcommand(configs: &Configs, name: &str, sub: &ArgMatches) -> Result<()> {
    if name == "create-keypairs" {
        let count = sub.get_one::<usize>("count").copied().unwrap_or(27);
        return run_create_keypairs(configs, count, sub.get_flag("force"));
    }

    let ctx = LaunchContext::connect(configs.clone())?;
    let report = match name {
        "checklist" => {
            print_readiness(&ctx).await?;
            return Ok(());
        }
        "create-lut" => {
            ctx.create_lookup_table(TipOnly { tip_lamports: tip_from(configs, sub)? })
                .await?
        }
        "extend-lut" => {
            ctx.extend_lookup_table(TipOnly { tip_lamports: tip_from(configs, sub)? })
                .await?
        }
        "fund-workers" => {
            ctx.fund_workers(FundWorkersParams {
                lamports_per_worker: parse_sol(required(sub, "sol")?)?,
                tip_lamports: tip_from(configs, sub)?,
            })
            .await?
        }
        "distribute-wsol" => {
            ctx.distribute_wsol(DistributeWsolParams {
                step_lamports: parse_sol(required(sub, "step")?)?,
                tip_lamports: tip_from(configs, sub)?,
            })
            .await?
        }
        "close-wsol" => {
            ctx.close_wsol_accounts(TipOnly { tip_lamports: tip_from(configs, sub)? })
                .await?
        }
        "create-pool" => {
            let market_id = Pubkey::from_str(required(sub, "market")?)
                .map_err(|e| anyhow!("invalid market id: {}", e))?;
            let base_ui: f64 = required(sub, "base-amount")?
                .parse()
                .context("invalid base amount")?;
            let decimals = ctx.base_decimals(&market_id).await?;
            ctx.build_and_submit_pool_bundle(PoolBundleParams {
                market_id,
                base_amount: ui_to_raw_amount(base_ui, decimals),
                quote_lamports: parse_sol(required(sub, "quote-sol")?)?,
                open_time: None,
                tip_lamports: tip_from(configs, sub)?,
                iterations: sub.get_one::<u32>("iterations").copied().unwrap_or(1),
                delay: Duration::from_secs(sub.get_one::<u64>("delay").copied().unwrap_or(0)),
            })
            .await?
        }
        "buy" => {
            ctx.build_and_submit_buy_bundle(TipOnly { tip_lamports: tip_from(configs, sub)? })
                .await?
        }
        "sell-all" => {
            ctx.build_and_submit_sell_bundle(TipOnly { tip_lamports: tip_from(configs, sub)? })
                .await?
        }
        "sell-percentage" => {
            let percent: f64 = required(sub, "percent")?.parse().context("invalid percentage")?;
            ctx.build_and_submit_sell_percentage(SellPercentageParams {
                percent,
                tip_lamports: tip_from(configs, sub)?,
                operation_sequence: parse_sequence(required(sub, "sequence")?)?,
                buy_lamports: parse_sol(required(sub, "buy-sol")?)?,
            })
            .await?
        }
        "remove-liquidity" => {
            ctx.build_and_submit_remove_liquidity(TipOnly { tip_lamports: tip_from(configs, sub)? })
                .await?
        }
        other => return Err(anyhow!("unknown command {}", other)),
    };
    print_report(&report);
    Ok(())
}

fn run_create_keypairs(configs: &Configs, count: usize, force: bool) -> Result<()> {
    let keys = create_keypairs(&configs.keystore_path, count, force)?;
    println!(
        "{} {} worker keypairs written to {}",
        "✅".green(),
        keys.len(),
        configs.keystore_path
    );
    for (i, key) in keys.iter().enumerate() {
        println!("  worker[{:>2}] {}", i, key);
    }
    Ok(())
}

fn print_report(report: &OperationReport) {
    if report.bundles.is_empty() {
        println!("{}", "Nothing to submit".yellow());
    }
    for (i, bundle) in report.bundles.iter().enumerate() {
        let id = bundle
            .receipt
            .as_ref()
            .map(|r| r.bundle_id.clone())
            .unwrap_or_else(|| "dry run".to_string());
        let outcome = match &bundle.outcome {
            Some(outcome) => format!("{:?}", outcome),
            None => "not awaited".to_string(),
        };
        println!("  bundle {} {} -> {}", i + 1, id.cyan(), outcome);
    }
    if let Some(state) = &report.state {
        if let Some(pool) = state.pool_id {
            println!("  pool      {}", pool);
        }
        if let Some(table) = state.lookup_table {
            println!("  lookup    {}", table);
        }
    }
}

async fn print_readiness(ctx: &LaunchContext) -> Result<()> {
    let ready = ctx.launch_readiness().await?;
    println!("{}", "Launch readiness".bold());
    println!(
        "  lookup table   {}",
        ready
            .lookup_table
            .map(|t| t.to_string())
            .unwrap_or_else(|| "not created".red().to_string())
    );
    if let Some(missing) = ready.unregistered {
        let line = format!("{} launch addresses not registered", missing);
        println!("  {}", if missing == 0 { line.green() } else { line.yellow() });
    }
    println!("  fee payer      {:.4} SOL", lamports_to_sol(ready.payer_lamports));
    println!("  primary        {:.4} SOL", lamports_to_sol(ready.primary_lamports));
    for (i, worker) in ready.workers.iter().enumerate() {
        println!(
            "  worker[{:>2}] {}  {:.4} SOL  {:.4} WSOL  base {}",
            i,
            short_address(&worker.pubkey),
            lamports_to_sol(worker.lamports),
            lamports_to_sol(worker.wsol),
            worker
                .base
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

// Interactive menu

fn prompt(label: &str) -> Result<String> {
    print!("{} ", label.bold());
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(anyhow!("stdin closed"));
    }
    Ok(input.trim().to_string())
}

fn prompt_parse<T: FromStr>(label: &str, mut default: Option<T>) -> Result<T> {
    loop {
        let input = prompt(label)?;
        if input.is_empty() {
            if let Some(value) = default.take() {
                return Ok(value);
            }
        }
        match input.parse::<T>() {
            Ok(value) => return Ok(value),
            Err(_) => println!("{}", "Invalid value, try again".red()),
        }
    }
}

fn prompt_tip(configs: &Configs) -> Result<u64> {
    let default = configs.bundle.default_tip_sol;
    let sol: f64 = prompt_parse(&format!("Tip in SOL [{}]:", default), Some(default))?;
    Ok(sol_to_lamports(sol))
}

fn prompt_sol(label: &str) -> Result<u64> {
    let sol: f64 = prompt_parse(label, None)?;
    Ok(sol_to_lamports(sol))
}

/// Context is built on first use so keypairs can be created before a
/// keystore exists.
fn context<'a>(
    slot: &'a mut Option<LaunchContext>,
    configs: &Configs,
) -> Result<&'a LaunchContext> {
    if slot.is_none() {
        *slot = Some(LaunchContext::connect(configs.clone())?);
    }
    slot.as_ref().ok_or_else(|| anyhow!("launch context unavailable"))
}

async fn run_menu(configs: &Configs) -> Result<()> {
    let mut ctx: Option<LaunchContext> = None;
    loop {
        println!();
        println!("{}", "=== Launch Bundler ===".bold().cyan());
        println!("  1) Create keypairs");
        println!("  2) Pre-launch checklist");
        println!("  3) Create pool bundle");
        println!("  4) Buy from workers");
        println!("  5) Sell all");
        println!("  6) Sell percentage");
        println!("  7) Remove liquidity");
        println!("  0) Exit");

        let choice = prompt("Select:")?;
        let outcome = match choice.as_str() {
            "1" => menu_create_keypairs(configs).map(|_| {
                // Workers changed; reload them on next use
                ctx = None;
            }),
            "2" => match context(&mut ctx, configs) {
                Ok(c) => checklist_menu(c, configs).await,
                Err(e) => Err(e),
            },
            "3" => match context(&mut ctx, configs) {
                Ok(c) => menu_create_pool(c, configs).await,
                Err(e) => Err(e),
            },
            "4" => match context(&mut ctx, configs) {
                Ok(c) => menu_buy(c, configs).await,
                Err(e) => Err(e),
            },
            "5" => match context(&mut ctx, configs) {
                Ok(c) => menu_sell_all(c, configs).await,
                Err(e) => Err(e),
            },
            "6" => match context(&mut ctx, configs) {
                Ok(c) => menu_sell_percentage(c, configs).await,
                Err(e) => Err(e),
            },
            "7" => match context(&mut ctx, configs) {
                Ok(c) => menu_remove_liquidity(c, configs).await,
                Err(e) => Err(e),
            },
            "0" | "q" | "exit" => {
                logger::info(LogTag::System, "Bye");
                return Ok(());
            }
            _ => {
                println!("{}", "Unknown option".red());
                Ok(())
            }
        };

        if let Err(e) = outcome {
            report_error(&e);
        }
    }
}

fn report_error(e: &anyhow::Error) {
    logger::error(LogTag::System, &format!("{:#}", e));
    if let Some(bundler) = e.downcast_ref::<BundlerError>() {
        logger::warning(LogTag::System, recovery_hint(bundler));
    }
}

fn recovery_hint(error: &BundlerError) -> &'static str {
    if error.is_outcome_unknown() {
        "The bundle may still land: check the ledger for its transactions before running the operation again"
    } else if error.is_operator_retryable() {
        "Nothing was executed; the operation can be run again to rebuild the bundle"
    } else if error.is_fatal() {
        "Operation aborted; fix the cause above before running it again"
    } else {
        "Operation did not complete"
    }
}

fn menu_create_keypairs(configs: &Configs) -> Result<()> {
    let count: usize = prompt_parse("How many worker keypairs? [27]:", Some(27))?;
    let force = if std::path::Path::new(&configs.keystore_path).exists() {
        let answer = prompt("A keystore exists. Overwrite it? (yes/no):")?;
        if answer != "yes" {
            println!("Keeping the existing keystore");
            return Ok(());
        }
        true
    } else {
        false
    };
    run_create_keypairs(configs, count, force)
}

async fn checklist_menu(ctx: &LaunchContext, configs: &Configs) -> Result<()> {
    loop {
        println!();
        println!("{}", "--- Pre-launch checklist ---".bold());
        println!("  1) Create lookup table");
        println!("  2) Extend lookup table");
        println!("  3) Fund workers (SOL + token accounts)");
        println!("  4) Distribute WSOL");
        println!("  5) Close WSOL accounts");
        println!("  6) Show readiness");
        println!("  0) Back");

        let choice = prompt("Select:")?;
        if choice == "0" {
            return Ok(());
        }
        if let Err(e) = checklist_action(ctx, configs, &choice).await {
            report_error(&e);
        }
    }
}

async fn checklist_action(ctx: &LaunchContext, configs: &Configs, choice: &str) -> Result<()> {
    let report = match choice {
        "1" => {
            ctx.create_lookup_table(TipOnly { tip_lamports: prompt_tip(configs)? })
                .await?
        }
        "2" => {
            ctx.extend_lookup_table(TipOnly { tip_lamports: prompt_tip(configs)? })
                .await?
        }
        "3" => {
            let lamports_per_worker = prompt_sol("SOL per worker:")?;
            ctx.fund_workers(FundWorkersParams {
                lamports_per_worker,
                tip_lamports: prompt_tip(configs)?,
            })
            .await?
        }
        "4" => {
            let step_lamports = prompt_sol("WSOL step in SOL (worker i gets step * (i+1)):")?;
            ctx.distribute_wsol(DistributeWsolParams {
                step_lamports,
                tip_lamports: prompt_tip(configs)?,
            })
            .await?
        }
        "5" => {
            ctx.close_wsol_accounts(TipOnly { tip_lamports: prompt_tip(configs)? })
                .await?
        }
        "6" => return print_readiness(ctx).await,
        _ => {
            println!("{}", "Unknown option".red());
            return Ok(());
        }
    };
    print_report(&report);
    Ok(())
}

async fn menu_buy(ctx: &LaunchContext, configs: &Configs) -> Result<()> {
    let tip_lamports = prompt_tip(configs)?;
    let report = ctx.build_and_submit_buy_bundle(TipOnly { tip_lamports }).await?;
    print_report(&report);
    Ok(())
}

async fn menu_sell_all(ctx: &LaunchContext, configs: &Configs) -> Result<()> {
    let tip_lamports = prompt_tip(configs)?;
    let report = ctx.build_and_submit_sell_bundle(TipOnly { tip_lamports }).await?;
    print_report(&report);
    Ok(())
}

async fn menu_remove_liquidity(ctx: &LaunchContext, configs: &Configs) -> Result<()> {
    let tip_lamports = prompt_tip(configs)?;
    let report = ctx
        .build_and_submit_remove_liquidity(TipOnly { tip_lamports })
        .await?;
    print_report(&report);
    Ok(())
}

async fn menu_create_pool(ctx: &LaunchContext, configs: &Configs) -> Result<()> {
    let market_id: Pubkey = prompt_parse("Market id:", None)?;
    let decimals = ctx.base_decimals(&market_id).await?;
    let base_ui: f64 = prompt_parse("Base tokens to deposit:", None)?;
    let quote_lamports = prompt_sol("SOL to deposit:")?;
    let iterations: u32 = prompt_parse("Cycles [1]:", Some(1))?;
    let delay: u64 = prompt_parse("Seconds between cycles [0]:", Some(0))?;
    let tip_lamports = prompt_tip(configs)?;

    let report = ctx
        .build_and_submit_pool_bundle(PoolBundleParams {
            market_id,
            base_amount: ui_to_raw_amount(base_ui, decimals),
            quote_lamports,
            open_time: None,
            tip_lamports,
            iterations,
            delay: Duration::from_secs(delay),
        })
        .await?;
    print_report(&report);
    Ok(())
}

async fn menu_sell_percentage(ctx: &LaunchContext, configs: &Configs) -> Result<()> {
    let percent: f64 = prompt_parse("Percentage of each worker's balance:", None)?;
    let sequence = prompt("Swap sequence [sell]:")?;
    let operation_sequence = if sequence.is_empty() {
        vec![Direction::Sell]
    } else {
        parse_sequence(&sequence)?
    };
    let buy_lamports = if operation_sequence.contains(&Direction::Buy) {
        prompt_sol("SOL per buy:")?
    } else {
        0
    };
    let tip_lamports = prompt_tip(configs)?;

    let report = ctx
        .build_and_submit_sell_percentage(SellPercentageParams {
            percent,
            tip_lamports,
            operation_sequence,
            buy_lamports,
        })
        .await?;
    print_report(&report);
    Ok(())
}
