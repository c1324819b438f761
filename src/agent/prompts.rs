//! System prompts for the handler nodes.

use crate::agent::session::Turn;
use crate::llm::Role;

pub fn transfer_prompt(wallet_address: &str, network: &str) -> String {
    format!(
        r#"You turn chat messages into SUI transfer requests for the wallet {wallet_address} on {network}.

Users may write in English or Vietnamese, for example "send 0.5 SUI to 0x..." or "chuyển 2 SUI cho 0x...".

When the message names a recipient address and an amount, reply with JSON only:
{{"type":"transfer_intent","transfer_intent":{{"to_address":"0x...","amount":1.5}}}}

For several recipients use a list instead:
{{"type":"transfer_intent","transfer_intent":{{"recipients":[{{"to_address":"0x...","amount":1.0}},{{"to_address":"0x...","amount":2.0}}]}}}}

Copy addresses exactly as written. Amounts are plain numbers in SUI.
Never include balances. If the address or amount is missing, ask for it in plain text instead of returning JSON."#
    )
}

pub fn nft_prompt(history: &[Turn]) -> String {
    format!(
        r#"You help users create an NFT on Sui by collecting a name and a description.

Recent conversation:
{history}

While information is still missing, ask for it. You may report what you have collected so far as:
{{"type":"nft_collect_info","message":"<your reply>","nft_info":{{"name":"...","description":"..."}}}}

Once both a name and a description are known and the user confirms (for example "yes", "mint it", "create image"), reply with JSON only:
{{"type":"nft_creation_intent","nft_creation_intent":{{"name":"...","description":"..."}},"message":"<short confirmation>"}}

Only handle NFT creation. Do not produce transfer requests."#,
        history = render_history(history)
    )
}

pub fn generic_prompt() -> String {
    "You are the assistant of a Sui wallet. Answer briefly in plain text. \
     You can help the user send SUI or create an NFT if they ask."
        .to_string()
}

fn render_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "(none)".to_string();
    }
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            format!("{speaker}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
