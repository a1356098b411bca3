use super::{json_pretty, EXIT_SUCCESS, EXIT_UNSUPPORTED_PLATFORM};
use natpack_schema::{Platform, SUPPORTED_PLATFORMS};

pub fn run(list: bool, json: bool) -> Result<u8, String> {
    if list {
        let ids: Vec<String> = SUPPORTED_PLATFORMS.iter().map(Platform::identifier).collect();
        if json {
            println!("{}", json_pretty(&ids)?);
        } else {
            for id in &ids {
                println!("{id}");
            }
        }
        return Ok(EXIT_SUCCESS);
    }

    match Platform::current() {
        Ok(platform) => {
            if json {
                let payload = serde_json::json!({
                    "platform": platform.identifier(),
                    "os": platform.os,
                    "arch": platform.arch,
                    "supported": true,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("{platform}");
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if json {
                let payload = serde_json::json!({
                    "os": std::env::consts::OS,
                    "arch": std::env::consts::ARCH,
                    "supported": false,
                    "error": e.to_string(),
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                eprintln!("{e}");
            }
            Ok(EXIT_UNSUPPORTED_PLATFORM)
        }
    }
}
