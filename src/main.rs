use {
  bwrapbox::{exec_bwrap, parse, Invocation, Supervisor, HELP},
  std::{
    env,
    io::{self, Write},
    process,
  },
  tracing_subscriber::EnvFilter,
};

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let args: Vec<String> = env::args().skip(1).collect();

  let error = match parse(&args) {
    Ok(Invocation::Help) => {
      print!("{HELP}");
      let _ = io::stdout().flush();

      exec_bwrap(&["bwrap".to_string(), "--help".to_string()])
    }
    Ok(Invocation::Run(config)) => match Supervisor::new(config).run() {
      Ok(status) => process::exit(status),
      Err(error) => error,
    },
    Err(error) => error,
  };

  eprintln!("bwrapbox: {error}");
  process::exit(255);
}
