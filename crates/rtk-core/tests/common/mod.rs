use rtk_core::{Report, ReportOptions};
use serde_json::{json, Value};

/// A small but realistic diagnostic report
#[allow(dead_code)]
pub fn sample_value() -> Value {
    json!({
        "header": {
            "event": "JavaScript API",
            "trigger": "GetReport",
            "filename": null,
            "dumpEventTime": "2019-10-04T12:42:10Z",
            "dumpEventTimestamp": "1570208530193",
            "processId": 4242,
            "cwd": "/srv/app",
            "commandLine": ["node", "server.js"],
            "componentVersions": {"node": "12.11.1", "openssl": "1.1.1c", "zlib": "1.2.11"},
            "cpus": [{"model": "cpu0", "speed": 2400}, {"model": "cpu1", "speed": 2400}]
        },
        "javascriptStack": {
            "message": "Error [ERR_SYNTHETIC]: JavaScript Callstack",
            "stack": ["at Object.<anonymous> (/srv/app/server.js:3:9)", "at Module._compile (internal/modules/cjs/loader.js:936:30)"]
        },
        "resourceUsage": {"cpuConsumptionPercent": 25, "userCpuSeconds": 0.3, "kernelCpuSeconds": 0.1},
        "libuv": [{"type": "timer", "is_active": false}],
        "environmentVariables": {"HOME": "/home/app", "NPM_TOKEN": "npm_secret", "PATH": "/usr/bin"},
        "sharedObjects": ["/lib/x86_64-linux-gnu/libdl.so.2", "/usr/lib/libssl.so.1.1.1c"]
    })
}

/// Build a report named `filename` from `value`
#[allow(dead_code)]
pub fn report_from(value: Value, filename: &str) -> Report {
    Report::from_value(value, &ReportOptions::default().with_filename(filename))
        .expect("fixture must be a valid report")
}

#[allow(dead_code)]
pub fn sample_report(filename: &str) -> Report {
    report_from(sample_value(), filename)
}

/// `sample_value` with a different CPU consumption
#[allow(dead_code)]
pub fn report_with_cpu(filename: &str, percent: f64, timestamp: &str) -> Report {
    let mut value = sample_value();
    value["resourceUsage"]["cpuConsumptionPercent"] = json!(percent);
    value["header"]["dumpEventTimestamp"] = json!(timestamp);
    report_from(value, filename)
}
