use std::collections::HashMap;

use serenity::{
    framework::standard::{macros::command, CommandResult},
    model::prelude::Message,
    prelude::Context,
    utils::MessageBuilder,
};
use sqlx::{postgres::PgRow, Column, Row, TypeInfo, ValueRef};

use crate::app_state::type_map_keys::BotCfgKey;
use crate::immut_data::dynamic::WHITESPACE;

#[command]
#[owners_only]
#[description = "Run a raw PostgreSQL errand against the progression tables. Use with caution."]
async fn sql(ctx: &Context, msg: &Message) -> CommandResult {
    let query = {
        let data = ctx.data.read().await;
        let bot_cfg = data
            .get::<BotCfgKey>()
            .unwrap_or_else(|| panic!("Failed to get the bot config from the typemap"));
        let q = msg
            .content
            .trim_start_matches(&bot_cfg.discord_prefix)
            .trim_start_matches("sql ");
        WHITESPACE.replace_all(q, " ").into_owned()
    };
    println!("Executing query: \"{query}\"");
    let pool = super::pool(ctx).await;
    let res: Vec<PgRow> = sqlx::query(&query).fetch_all(&pool).await?;

    let response = {
        let db_response = serde_json::to_string_pretty(&render_rows(&res))?;
        let mut msg_builder = MessageBuilder::new();
        msg_builder
            .mention(&msg.author)
            .push("\n\n")
            .push("Result:\n")
            .push("```json\n")
            .push(&db_response)
            .push("```");
        msg_builder.build()
    };

    msg.reply(&ctx.http, &response).await?;

    Ok(())
}

/// Renders arbitrary rows as column-name -> printable-value maps.
fn render_rows(rows: &[PgRow]) -> Vec<HashMap<String, String>> {
    let mut simplified = Vec::<HashMap<String, String>>::with_capacity(rows.len());
    for row in rows {
        let columns = row.columns();
        let mut hm = HashMap::<String, String>::with_capacity(columns.len());
        for col in columns {
            let value = row.try_get_raw(col.ordinal()).unwrap();
            let value = match value.format() {
                sqlx::postgres::PgValueFormat::Binary => 'output: {
                    let type_name = value.type_info().name().to_owned();
                    if value.is_null() {
                        break 'output format!("NULL: ({type_name})");
                    };
                    let slice = match value.as_bytes() {
                        Ok(slice) => slice,
                        Err(e) => break 'output format!("{e:?}: ({type_name})"),
                    };
                    match type_name.as_str() {
                        "INT8" => {
                            let value = i64::from_be_bytes(slice.try_into().unwrap());
                            format!("{value}: (INT8)")
                        }
                        "BOOL" => {
                            let value: bool = slice[0] == 1;
                            format!("{value:?}: (BOOL)")
                        }
                        "TEXT" | "VARCHAR" => {
                            let value = std::str::from_utf8(slice);
                            format!("{value:?}: ({type_name})")
                        }
                        _ => format!("{slice:?}: ({type_name})"),
                    }
                }
                sqlx::postgres::PgValueFormat::Text => value.as_str().unwrap().to_string(),
            };
            hm.insert(col.name().to_string(), value);
        }
        simplified.push(hm);
    }
    simplified
}
