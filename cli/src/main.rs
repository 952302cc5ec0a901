use std::{error::Error, fs::File, io::Write};

use rtlopt_netlist::{Design, Selection};

fn read_input(name: &str) -> Result<Design, Box<dyn Error>> {
    if name.ends_with(".il") {
        Ok(rtlopt_netlist::parse(&std::fs::read_to_string(name)?)?)
    } else if name.ends_with(".json") {
        Ok(rtlopt_yosys_json::import(&mut File::open(name)?)?)
    } else if name.is_empty() {
        Err("no input provided".into())
    } else {
        Err(format!("don't know what to do with input {name:?}").into())
    }
}

fn write_output(design: &Design, name: &str) -> Result<(), Box<dyn Error>> {
    if name.ends_with(".il") {
        write!(&mut File::create(name)?, "{design}")?;
    } else if name.ends_with(".json") {
        rtlopt_yosys_json::export(&mut File::create(name)?, design)?;
    } else if name.is_empty() {
        print!("{design}");
    } else {
        return Err(format!("don't know what to do with output {name:?}").into());
    }
    Ok(())
}

fn init_logging(verbose: usize) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).format_timestamp(None).parse_default_env().init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut version = false;
    let mut verbose = 0usize;
    let mut input = String::new();
    let mut output = String::new();
    let mut modules = Vec::<String>::new();
    {
        let mut parser = argparse::ArgumentParser::new();
        parser.set_description("Turns memory read-to-write feedback paths into write enable logic.");
        parser.refer(&mut version).add_option(&["--version"], argparse::StoreTrue, "Display version");
        parser.refer(&mut verbose).add_option(&["-v", "--verbose"], argparse::IncrBy(1usize), "Log more details");
        parser.refer(&mut input).add_argument("INPUT", argparse::Store, "Input file (.il or .json)");
        parser.refer(&mut output).add_argument("OUTPUT", argparse::Store, "Output file (.il or .json)");
        parser.refer(&mut modules).add_argument("MODULE", argparse::List, "Modules to process (default: all)");
        parser.parse_args_or_exit();
    }

    if version {
        println!("rtlopt git-{}", env!("GIT_HASH"));
        return Ok(());
    }
    init_logging(verbose);

    let mut design = read_input(&input)?;
    let selection = Selection::from_args(modules);
    log::info!("Executing OPT_MEM_FEEDBACK pass (finding memory read-to-write feedback paths).");
    let stats = rtlopt_memory::opt_mem_feedback(&mut design, &selection)?;
    log::debug!("{stats:?}");
    write_output(&design, &output)?;
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {}", error);
        std::process::exit(1)
    }
}
