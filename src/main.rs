use clap::Parser;
use reactor_http::{Connection, DEFAULT_BARE_BODY, DEFAULT_PORT, Reactor, Response, ServerBuilder};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Poll-based HTTP server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Port to listen on (all interfaces).
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Serve one fixed response for every request instead of routing.
    #[arg(long)]
    bare: bool,

    /// Body of the bare-mode response.
    #[arg(long, default_value_t = DEFAULT_BARE_BODY.to_owned())]
    body: String,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut reactor = match Reactor::new() {
        Ok(reactor) => reactor,
        Err(err) => {
            error!(error = %err, "failed to create reactor");
            return ExitCode::FAILURE;
        }
    };

    let mut server = match ServerBuilder::new(args.port)
        .bare_body(args.body)
        .build(&mut reactor)
    {
        Ok(server) => server,
        Err(err) => {
            error!(error = %err, "failed to start HTTP server");
            return ExitCode::FAILURE;
        }
    };

    if !args.bare {
        let routes = [("/", DEFAULT_BARE_BODY), ("/hello", "Hello World!")];
        for (path, body) in routes {
            let added = server.add_route(path, move |mut conn: Connection<'_>, _request: &[u8]| {
                if let Err(err) = conn.respond(&Response::ok().body(body)) {
                    error!(fd = conn.descriptor(), error = %err, "response write failed");
                }
                conn.close();
            });

            if let Err(err) = added {
                error!(path, error = %err, "failed to add route");
                server.shutdown(&mut reactor);
                return ExitCode::FAILURE;
            }
        }
        info!(routes = ?server.route_paths(), "routes ready");
    }

    if let Err(err) = reactor.run() {
        error!(error = %err, "reactor failed");
        server.shutdown(&mut reactor);
        return ExitCode::FAILURE;
    }

    server.shutdown(&mut reactor);
    ExitCode::SUCCESS
}
