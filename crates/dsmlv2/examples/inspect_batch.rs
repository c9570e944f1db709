//! Simple inspector for DSMLv2 batch files.
//!
//! Set `RUST_LOG=dsmlv2=trace` to see decoder diagnostics.

use std::fs;

use dsmlv2::codec::{EncodeOptions, decode_batch_str};
use dsmlv2::{Filter, Request, Value, encode_batch_to_string};
use tracing_subscriber::EnvFilter;

fn format_value(v: &Value) -> String {
    match v {
        Value::String(s) => {
            let preview: String = s.chars().take(60).collect();
            if s.chars().count() > 60 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Value::Binary(b) => format!("BINARY[{}]", b.len()),
    }
}

fn format_filter(f: &Filter) -> String {
    match f {
        Filter::And(items) => format!("(&{})", items.iter().map(format_filter).collect::<String>()),
        Filter::Or(items) => format!("(|{})", items.iter().map(format_filter).collect::<String>()),
        Filter::Not(inner) => format!("(!{})", format_filter(inner)),
        Filter::EqualityMatch(a) => format!("({}={})", a.name, format_value(&a.value)),
        Filter::GreaterOrEqual(a) => format!("({}>={})", a.name, format_value(&a.value)),
        Filter::LessOrEqual(a) => format!("({}<={})", a.name, format_value(&a.value)),
        Filter::ApproxMatch(a) => format!("({}~={})", a.name, format_value(&a.value)),
        Filter::Present(name) => format!("({}=*)", name),
        Filter::Substrings(s) => format!("({}=<substrings>)", s.name),
        Filter::ExtensibleMatch(m) => format!(
            "({}:{}:={})",
            m.name.as_deref().unwrap_or(""),
            m.matching_rule.as_deref().unwrap_or(""),
            format_value(&m.value)
        ),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .expect("usage: inspect_batch <file.xml>");

    println!("Reading: {}", path);
    let xml = fs::read_to_string(&path).expect("Failed to read file");
    let batch = decode_batch_str(&xml).expect("Failed to decode");

    println!("\n=== Batch ===");
    if let Some(id) = &batch.request_id {
        println!("Request ID: {}", id);
    }
    println!("Processing: {}", batch.effective_processing().as_str());
    println!("Response order: {}", batch.effective_response_order().as_str());
    println!("On error: {}", batch.effective_on_error().as_str());

    println!("\n=== Requests ({}) ===", batch.len());
    for (i, request) in batch.requests.iter().enumerate() {
        let id = request.request_id.as_deref().unwrap_or("-");
        print!("[{}] {} (id {})", i, request.kind(), id);
        match &request.request {
            Request::Add(r) => {
                println!(" {}", r.dn().map(|dn| dn.up_name()).unwrap_or(""));
                for attr in r.entry.attributes() {
                    let values: Vec<_> = attr.values().iter().map(format_value).collect();
                    println!("      {}: {}", attr.id(), values.join(", "));
                }
            }
            Request::Compare(r) => println!(
                " {} {}",
                r.dn.as_ref().map(|dn| dn.up_name()).unwrap_or(""),
                r.attribute_desc.as_deref().unwrap_or("")
            ),
            Request::ModifyDn(r) => println!(
                " {} -> {}",
                r.dn.as_ref().map(|dn| dn.up_name()).unwrap_or(""),
                r.new_rdn.as_ref().map(|rdn| rdn.up_name()).unwrap_or("")
            ),
            Request::Delete(r) => println!(" {}", r.dn.as_ref().map(|dn| dn.up_name()).unwrap_or("")),
            Request::Modify(r) => {
                println!(" {}", r.dn.as_ref().map(|dn| dn.up_name()).unwrap_or(""));
                for m in &r.modifications {
                    println!("      {} {} ({} values)", m.operation.as_str(), m.attribute.id(), m.attribute.len());
                }
            }
            Request::Search(r) => println!(
                " {} {}",
                r.base.as_ref().map(|dn| dn.up_name()).unwrap_or(""),
                r.filter.as_ref().map(format_filter).unwrap_or_default()
            ),
            Request::Abandon(r) => println!(" {}", r.abandon_id.as_deref().unwrap_or("")),
            Request::Extended(r) => println!(" {}", r.request_name.as_deref().unwrap_or("")),
            Request::Bind(r) => println!(" {}", r.principal.as_deref().unwrap_or("")),
            Request::Unbind => println!(),
        }
        for control in &request.controls {
            println!("      control {} critical={}", control.oid, control.criticality);
        }
    }

    let canonical = encode_batch_to_string(&batch, &EncodeOptions::pretty()).expect("Failed to encode");
    println!("\n=== Re-encoded ({} bytes) ===", canonical.len());
    println!("{}", canonical);
}
