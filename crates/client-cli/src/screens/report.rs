//! Service report form, driven by short commands

use anyhow::Result;
use chrono::Local;
use tokio::io::AsyncBufRead;
use uuid::Uuid;

use super::{dim, failure, heading, notice, success, Console};
use crate::report::{DetailField, PartsInput, ReportError, ReportField, ServiceReportDraft, ServiceType, ENGINEERS};

const HELP: &str = "\
  show                      print the report
  fields                    list field keys and their options
  set <field> <value>       fill a field, e.g. set customer 2
  type <service type>       pick a service type by name or number
  detail <field> <value>    fill a service detail, e.g. detail brand Bosch
  engineer <name>           toggle an engineer by name or number
  part add                  add a parts line
  part del <n>              delete parts line n
  save                      validate and save the report
  clear                     reset the form
  back                      leave the form";

pub async fn show<R: AsyncBufRead + Unpin>(console: &mut Console<R>) -> Result<()> {
    heading("📋 Service Report");
    let mut draft = ServiceReportDraft::today();
    edit(&mut draft, console).await
}

async fn edit<R: AsyncBufRead + Unpin>(draft: &mut ServiceReportDraft, console: &mut Console<R>) -> Result<()> {
    dim("Type 'help' for commands");
    loop {
        let line = console.prompt("report").await?;
        let (command, rest) = split_word(&line);
        let result = match command.to_ascii_lowercase().as_str() {
            "" => Ok(()),
            "help" | "?" => {
                println!("{}", HELP);
                Ok(())
            }
            "show" => {
                println!("{}", draft.render());
                Ok(())
            }
            "fields" => {
                list_fields(draft);
                Ok(())
            }
            "set" => set(draft, rest),
            "type" => rest.parse::<ServiceType>().map(|t| {
                draft.select_service_type(t);
                let fields: Vec<&str> = t.fields().iter().map(DetailField::key).collect();
                dim(&format!("{} details: {}", t, fields.join(", ")));
            }),
            "detail" => {
                let (field, value) = split_word(rest);
                field.parse::<DetailField>().and_then(|f| draft.set_detail(f, value))
            }
            "engineer" => draft.toggle_engineer(rest).map(|selected| {
                let verb = if selected { "Selected" } else { "Removed" };
                dim(&format!("{}, now: {}", verb, draft.selected_engineers.join(", ")));
            }),
            "part" | "parts" => parts(draft, rest, console).await?,
            "save" => match draft.validate_for_save() {
                Ok(()) => {
                    println!("{}", draft.render());
                    success("Service report saved successfully!");
                    tracing::info!("Service report {} saved", draft.service_report_no);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            "clear" => {
                if console.confirm("Are you sure you want to clear all fields?").await? {
                    draft.clear(Local::now().date_naive());
                    dim("Form cleared");
                }
                Ok(())
            }
            "back" | "done" | "q" => return Ok(()),
            other => {
                notice(&format!("Unknown command '{}', type 'help'", other));
                Ok(())
            }
        };
        if let Err(e) = result {
            failure("Error", &e.to_string());
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

fn set(draft: &mut ServiceReportDraft, args: &str) -> Result<(), ReportError> {
    let (key, value) = split_word(args);
    let field: ReportField = key.parse()?;
    draft.set_field(field, value)?;
    match field {
        ReportField::TimeIn | ReportField::TimeOut if !draft.total_time().is_empty() => {
            dim(&format!("Total time: {}", draft.total_time()));
        }
        ReportField::Customer if !draft.customer.is_empty() => {
            dim(&format!("Customer name set to {}", draft.customer_name));
        }
        _ => {}
    }
    Ok(())
}

fn list_fields(draft: &ServiceReportDraft) {
    for field in ReportField::ALL {
        println!("  {:<22} {}", field.key(), field.label());
        if let Some(options) = field.options() {
            let numbered: Vec<String> = options
                .iter()
                .enumerate()
                .map(|(i, o)| format!("{}. {}", i + 1, o))
                .collect();
            dim(&format!("      {}", numbered.join("  ")));
        }
    }
    let types: Vec<String> = ServiceType::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect();
    println!("  Service types: {}", types.join("  "));
    let engineers: Vec<String> = ENGINEERS
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mark = if draft.selected_engineers.iter().any(|s| s == e) { "x" } else { " " };
            format!("[{}] {}. {}", mark, i + 1, e)
        })
        .collect();
    println!("  Engineers:");
    for e in engineers {
        println!("    {}", e);
    }
    if let Some(details) = draft.service_details() {
        println!("  {} details:", details.service_type());
        for field in details.service_type().fields() {
            println!("    {:<18} {}", field.key(), details.get(*field).unwrap_or_default());
        }
    }
}

async fn parts<R: AsyncBufRead + Unpin>(
    draft: &mut ServiceReportDraft,
    args: &str,
    console: &mut Console<R>,
) -> Result<Result<(), ReportError>> {
    let (action, rest) = split_word(args);
    match action {
        "add" => {
            let input = PartsInput {
                parts_required: console.prompt("Parts required").await?,
                brand_name: console.prompt("Brand name").await?,
                model_name: console.prompt("Model name").await?,
                part_number: console.prompt("Part number").await?,
                quantity: console.prompt("Quantity").await?,
            };
            Ok(draft.add_part(input).map(|id| dim(&format!("Added part {}", id))))
        }
        "del" | "delete" => {
            match part_id(draft, rest) {
                Some(id) if draft.delete_part(id) => dim("Part removed"),
                _ => notice(&format!("No parts line '{}'", rest)),
            }
            Ok(Ok(()))
        }
        _ => {
            if draft.parts().is_empty() {
                println!("  No parts added");
            }
            for (i, p) in draft.parts().iter().enumerate() {
                println!(
                    "  {}. {} | {} | {} | {} | qty {}",
                    i + 1,
                    p.parts_required,
                    p.brand_name,
                    p.model_name,
                    p.part_number,
                    p.quantity
                );
            }
            Ok(Ok(()))
        }
    }
}

/// A 1-based line number or a full id
fn part_id(draft: &ServiceReportDraft, arg: &str) -> Option<Uuid> {
    if let Ok(n) = arg.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| draft.parts().get(i)).map(|p| p.id);
    }
    Uuid::parse_str(arg).ok()
}
