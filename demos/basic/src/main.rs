/**
 * Minimal demo harness for the Mite Rust SDK.
 *
 * Point it at a backend and run:
 *
 *   MITE_ENDPOINT=http://localhost:8787 cargo run -p mite_demo
 *   cargo run -p mite_demo -- --panic             # test panic capture
 *   cargo run -p mite_demo -- --bug shot.png      # submit a bug with an attachment
 *   MITE_API_KEY=sk_test cargo run -p mite_demo -- --releases
 */
use mite::{Attachment, BugReportPayload, Fault, GetReleasesOptions, Mite, MiteConfig, Priority};

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let test_panic = args.iter().any(|a| a == "--panic");
    let list_releases = args.iter().any(|a| a == "--releases");
    let bug_attachment = args
        .iter()
        .position(|a| a == "--bug")
        .and_then(|i| args.get(i + 1).cloned());

    let mut config = MiteConfig::new("mite-demo", "pk_demo").retries(2);
    if let Ok(endpoint) = std::env::var("MITE_ENDPOINT") {
        config = config.endpoint(endpoint);
    }
    if let Ok(api_key) = std::env::var("MITE_API_KEY") {
        config = config.api_key(api_key);
    }

    let sdk = Mite::new(config).expect("invalid Mite configuration");
    sdk.init();

    /*
     * Manual capture of a real error (file not found).
     */
    match std::fs::read_to_string("/nonexistent/path.txt") {
        Ok(_) => unreachable!(),
        Err(e) => {
            sdk.log_error(&e, serde_json::Map::new());
            println!("[demo] captured an io::Error: {e}");
        }
    }

    /*
     * A rejection-style fault: background work whose failure nobody
     * observed. Gets tagged with a tracking id automatically.
     */
    sdk.capture_rejection(Fault::message("background sync failed"));
    println!("[demo] captured a rejection-style fault");

    if let Some(uri) = bug_attachment {
        let payload = BugReportPayload {
            title: "Demo bug from the Rust SDK".into(),
            description: "Submitted by the mite_demo harness".into(),
            reporter_email: Some("demo@example.com".into()),
            priority: Some(Priority::Low),
            attachments: vec![Attachment::new(uri)],
            ..Default::default()
        };

        match sdk.submit_bug(payload) {
            Ok(ack) => println!("[demo] bug report accepted: id={} status={}", ack.id, ack.status),
            Err(err) => println!("[demo] bug submission failed (try again): {err}"),
        }
    }

    if list_releases {
        match sdk.get_releases(GetReleasesOptions::default()) {
            Ok(releases) => {
                println!("[demo] {} release(s):", releases.len());
                for release in releases {
                    println!("  {} {} ({})", release.version, release.version_code, release.platform);
                }
            }
            Err(err) => println!("[demo] release listing failed: {err}"),
        }
    }

    /*
     * The panic hook (installed by init) intercepts this and delivers
     * the report before the default panic output runs.
     */
    if test_panic {
        println!("[demo] triggering a panic...");
        panic!("Test panic from the Mite demo");
    }

    println!("[demo] done; reports are flushed when the SDK drops");
}
