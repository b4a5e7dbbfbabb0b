use clap::{Arg, Command};
use dronesim::logging::{self, LogConfig, LogOutput};
use dronesim::scenario::ScenarioConfig;
use dronesim::simulation::{RunSummary, SimulationEngine};
use std::str::FromStr;

const DEMO_SCENARIO: &str = include_str!("../scenarios/crossing_rows.yaml");

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("dronesim")
        .version("0.1.0")
        .about("ドローンスウォームシミュレーション (Drone Swarm Simulation)")
        .long_about("目標に向かいながら互いの衝突を回避するドローン群を\n\
                     固定時間刻みでシミュレーションします。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みのデモスウォームを実行")
                .conflicts_with_all(["info", "scenario"])
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)。省略時は -v から決定")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_name("N")
                .value_parser(clap::value_parser!(f64))
                .help("実時間で毎秒N回ティックを進める（省略時は最速で実行）")
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("実行結果と最終状態をYAMLで書き出す")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let log_output = match matches
        .get_one::<String>("log-output")
        .map(|s| LogOutput::from_str(s))
        .unwrap_or(Ok(LogOutput::Console))
    {
        Ok(output) => output,
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(2);
        }
    };
    let level = matches
        .get_one::<String>("log-level")
        .map(|s| logging::parse_log_level(s))
        .unwrap_or_else(|| logging::level_for_verbosity(verbose_level));

    if let Err(e) = logging::init_logging(LogConfig {
        level,
        output: log_output,
        ..LogConfig::default()
    }) {
        eprintln!("ログ初期化エラー: {}", e);
    }

    println!("ドローンスウォームシミュレーション - dronesim v0.1.0");
    println!();

    let options = RunOptions {
        info_only: matches.get_flag("info"),
        verbose_level,
        fps: matches.get_one::<f64>("fps").copied(),
        output: matches.get_one::<String>("output").cloned(),
    };

    let result = if matches.get_flag("test") {
        println!("=== デモスウォーム実行モード ===");
        ScenarioConfig::from_yaml_str(DEMO_SCENARIO)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
            .and_then(|scenario| execute_scenario(scenario, &options))
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        run_scenario(scenario_path, &options)
    } else {
        show_default_help();
        return;
    };

    match result {
        Ok(_) => {
            if verbose_level > 0 {
                println!("シミュレーションが正常に完了しました。");
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

struct RunOptions {
    info_only: bool,
    verbose_level: u8,
    fps: Option<f64>,
    output: Option<String>,
}

/// シナリオファイルを読み込んで実行
fn run_scenario(scenario_path: &str, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if options.verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    execute_scenario(scenario, options)
}

/// シナリオの実行
fn execute_scenario(scenario: ScenarioConfig, options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    scenario.print_summary();
    println!();

    if options.info_only {
        return Ok(());
    }

    let mut simulation = SimulationEngine::new(scenario, options.verbose_level);
    simulation.initialize()?;

    let summary = match options.fps {
        Some(fps) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(simulation.run_paced(fps))?
        }
        None => simulation.run()?,
    };

    print_result(&summary);

    if let Some(path) = &options.output {
        std::fs::write(path, serde_yaml::to_string(&summary)?)?;
        println!("結果を書き出しました: {}", path);
    }

    Ok(())
}

/// 実行結果の表示
fn print_result(summary: &RunSummary) {
    println!();
    println!("=== 実行結果 ===");
    println!("積分法: {}", summary.integrator);
    println!("ステップ数: {} ({:.1}秒)", summary.steps, summary.sim_time_s);
    println!("到達: {}/{}機", summary.reached, summary.drones);
    match summary.min_separation_m {
        Some(d) => println!("最小ドローン間距離: {:.2}m", d),
        None => println!("最小ドローン間距離: -"),
    }
    println!("衝突判定半径内のステップ数: {}", summary.close_approach_steps);
    println!();
    println!("=== 最終状態 ===");
    for drone in &summary.final_state {
        println!("  {:<12} {:?}  {}", drone.id, drone.status, drone.position);
    }
}

/// デフォルトヘルプを表示
fn show_default_help() {
    println!("使用方法:");
    println!("  dronesim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>     シナリオファイルを指定して実行");
    println!("  -i, --info                シナリオ情報のみ表示");
    println!("  -t, --test                組み込みデモスウォームを実行");
    println!("  -v, --verbose             詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LEVEL>   ログレベル");
    println!("      --log-output <TARGET> ログ出力先 (console, file, both)");
    println!("      --fps <N>             実時間で毎秒N回ティック");
    println!("  -o, --output <FILE>       結果をYAMLで書き出す");
    println!("  -h, --help                このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/crossing_rows.yaml  - 2列のドローンが正面から交差");
    println!("  scenarios/head_on.yaml        - 2機が正面衝突コース");
    println!("  scenarios/merge_radius.yaml   - 半径近傍とRK4積分の合流シナリオ");
    println!();
    println!("例:");
    println!("  dronesim -s scenarios/head_on.yaml -v");
    println!("  dronesim -s scenarios/crossing_rows.yaml --fps 30");
    println!("  dronesim -s scenarios/merge_radius.yaml -i");
    println!("  dronesim --test -o result.yaml");
}
