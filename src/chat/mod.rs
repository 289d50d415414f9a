//! Chat router: composes display names per audience mode and delivers to
//! the right recipients, applying per-recipient suppression (team scope,
//! admin channel membership, ignore lists).

use tracing::info;

use crate::engine::{Capability, ChatKind, CommandArgs, ServerMsg};
use crate::flood;
use crate::resolver;
use crate::state::Team;
use crate::strutil::{self, color, MAX_SAY_TEXT};
use crate::GameModule;

/// Audience of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    All,
    Team,
    Tell,
    Action,
    ActionTeam,
    Admins,
}

impl ChatMode {
    fn team_scoped(self) -> bool {
        matches!(self, ChatMode::Team | ChatMode::ActionTeam)
    }
}

const FLOOD_NOTICE: &str = "Your chat is flood-limited; wait before chatting again";

fn has_prefix_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Scope tag shown before the sender name when team prefixes are enabled.
fn scope_prefix(gm: &GameModule, sender: Option<usize>) -> &'static str {
    if !gm.config.chat_team_prefix {
        return "";
    }
    match sender.and_then(|s| gm.ctx.client(s)).map(|c| c.team) {
        Some(team) => team.chat_prefix(),
        None => "",
    }
}

/// Deliver one already-composed message to one recipient, applying the
/// per-recipient filters.
fn say_to(
    gm: &mut GameModule,
    sender: Option<usize>,
    recipient: usize,
    mode: ChatMode,
    body_color: char,
    name: &str,
    text: &str,
    prefix: &str,
) {
    let Some(other) = gm.ctx.client(recipient) else {
        return;
    };

    let mut spec_allchat = false;
    if mode.team_scoped() {
        let same_team = sender.is_some_and(|s| gm.ctx.on_same_team(s, recipient));
        if !same_team {
            if other.team != Team::None {
                return;
            }
            spec_allchat = gm.admin.has_capability(recipient, Capability::SpecAllChat);
            if !spec_allchat {
                return;
            }
        }
    }

    if mode == ChatMode::Admins && !gm.admin.has_capability(recipient, Capability::AdminChat) {
        return;
    }

    let skip_notify = sender.is_some_and(|s| gm.ctx.clients[recipient].ignore.contains(s));

    let display_name = if spec_allchat {
        format!("{prefix}{name}")
    } else {
        name.to_string()
    };
    gm.engine.send(
        recipient,
        ServerMsg::Chat {
            kind: if mode.team_scoped() {
                ChatKind::TeamChat
            } else {
                ChatKind::Chat
            },
            from: sender,
            name: display_name,
            color: body_color,
            text: text.to_string(),
            skip_notify,
        },
    );
}

/// Route a chat message. `target` limits delivery to a single recipient
/// (private tells); otherwise every connected client is considered.
pub fn say(gm: &mut GameModule, sender: Option<usize>, target: Option<usize>, mode: ChatMode, text: &str) {
    if text.is_empty() {
        return;
    }

    if let Some(slot) = sender {
        if flood::flood_limited(gm, slot) {
            gm.print(slot, FLOOD_NOTICE);
            return;
        }
    }

    let prefix = scope_prefix(gm, sender);
    let sender_name = match sender {
        Some(s) => gm.client_name(s),
        None => "console".to_string(),
    };
    let sender_team = sender.and_then(|s| gm.ctx.client(s)).map(|c| c.team);
    let location = sender.and_then(|s| gm.engine.client_location(s));

    let (name, body_color) = match mode {
        ChatMode::All => {
            info!(mode = "say", from = %sender_name, %text);
            (format!("{prefix}{sender_name}^7: "), color::GREEN)
        }
        ChatMode::Team => {
            info!(mode = "sayteam", from = %sender_name, %text);
            let name = match &location {
                Some(loc) => format!("({sender_name}^7) ({loc}): "),
                None => format!("({sender_name}^7): "),
            };
            let c = if sender_team == Some(Team::None) {
                color::YELLOW
            } else {
                color::CYAN
            };
            (name, c)
        }
        ChatMode::Tell => {
            let same_team = match (sender, target) {
                (Some(s), Some(t)) => gm.ctx.on_same_team(s, t),
                _ => false,
            };
            let name = match &location {
                Some(loc) if same_team => format!("[{sender_name}^7] ({loc}): "),
                _ => format!("[{sender_name}^7]: "),
            };
            (name, color::MAGENTA)
        }
        ChatMode::Action => {
            info!(mode = "action", from = %sender_name, %text);
            (
                format!("^2{}^7{prefix}{sender_name}^7 ", gm.config.action_prefix),
                color::WHITE,
            )
        }
        ChatMode::ActionTeam => {
            info!(mode = "actionteam", from = %sender_name, %text);
            let name = match &location {
                Some(loc) => format!("^5{}^7{sender_name}^7 ({loc}) ", gm.config.action_prefix),
                None => format!("^5{}^7{sender_name}^7 ", gm.config.action_prefix),
            };
            (name, color::WHITE)
        }
        ChatMode::Admins => {
            let tag = if sender
                .map(|s| gm.admin.has_capability(s, Capability::AdminChat))
                .unwrap_or(true)
            {
                "[ADMIN]"
            } else {
                "[PLAYER]"
            };
            info!(mode = "say_admins", tag, from = %sender_name, %text);
            (format!("{prefix}{tag}{sender_name}^7: "), color::MAGENTA)
        }
    };

    // spectators below the configured admin level may only use team chat
    if mode != ChatMode::Team && sender_team == Some(Team::None) {
        let slot = sender.unwrap_or_default();
        if gm.admin.admin_level(slot) < gm.config.min_level_non_team_chat {
            gm.print(
                slot,
                "Sorry, but your admin level may only use teamchat while spectating.",
            );
            return;
        }
    }

    let text: String = text.chars().take(MAX_SAY_TEXT).collect();

    if let Some(target) = target {
        say_to(gm, sender, target, mode, body_color, &name, &text, prefix);
        return;
    }

    for recipient in 0..gm.ctx.clients.len() {
        say_to(gm, sender, recipient, mode, body_color, &name, &text, prefix);
    }
}

/// `say` family entry point: say, say_team, say_admins, a, me, me_team,
/// plus the slash-forms embedded in say text (`say /m …`, `say /me …`).
pub fn cmd_say(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    let joined = args.concat(0);
    let mut mode = ChatMode::All;
    let mut skipargs = 0;

    if has_prefix_ci(&joined, "say_team ") {
        mode = ChatMode::Team;
    }
    if has_prefix_ci(&joined, "say_admins ") || has_prefix_ci(&joined, "a ") {
        mode = ChatMode::Admins;
    }

    // some clients only know how to plain-say; pick /m etc back out
    if has_prefix_ci(&joined, "say /m ")
        || has_prefix_ci(&joined, "say_team /m ")
        || has_prefix_ci(&joined, "say /mt ")
        || has_prefix_ci(&joined, "say_team /mt ")
    {
        private_message(gm, Some(slot), args);
        return;
    }

    if has_prefix_ci(&joined, "say /a ")
        || has_prefix_ci(&joined, "say_team /a ")
        || has_prefix_ci(&joined, "say /say_admins ")
        || has_prefix_ci(&joined, "say_team /say_admins ")
    {
        mode = ChatMode::Admins;
        skipargs = 1;
    }

    if mode == ChatMode::Admins && !gm.admin.has_capability(slot, Capability::AdminChat) {
        if !gm.config.public_say_admins {
            gm.print(slot, "Sorry, but public use of say_admins has been disabled.");
            return;
        }
        gm.print(
            slot,
            "Your message has been sent to any available admins and to the server logs.",
        );
    }

    if has_prefix_ci(&joined, "say /me ") {
        if gm.config.action_prefix.is_empty() {
            return;
        }
        mode = ChatMode::Action;
        skipargs = 1;
    } else if has_prefix_ci(&joined, "say_team /me ") {
        if gm.config.action_prefix.is_empty() {
            return;
        }
        mode = ChatMode::ActionTeam;
        skipargs = 1;
    } else if has_prefix_ci(&joined, "me ") {
        if gm.config.action_prefix.is_empty() {
            return;
        }
        mode = ChatMode::Action;
    } else if has_prefix_ci(&joined, "me_team ") {
        if gm.config.action_prefix.is_empty() {
            return;
        }
        mode = ChatMode::ActionTeam;
    }

    if args.argc() < 2 {
        return;
    }

    let text = args.say_concat(1 + skipargs);
    say(gm, Some(slot), None, mode, &text);
}

/// `tell <slot> <message>`: private tell by explicit slot number.
pub fn cmd_tell(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    if args.argc() < 2 {
        return;
    }

    let Ok(target) = args.argv(1).parse::<usize>() else {
        return;
    };
    if target >= gm.ctx.clients.len() || gm.ctx.client(target).is_none() {
        return;
    }

    let text = args.concat(2);
    info!(
        mode = "tell",
        from = %gm.client_name(slot),
        to = %gm.client_name(target),
        %text
    );
    say(gm, Some(slot), Some(target), ChatMode::Tell, &text);
    // echo back to the sender unless they told themselves
    if slot != target {
        say(gm, Some(slot), Some(slot), ChatMode::Tell, &text);
    }
}

/// `m`/`mt <name|slot> <message>`: private message with resolver-based
/// multi-targeting. Recipients ignoring the sender are skipped and
/// reported back.
pub fn private_message(gm: &mut GameModule, sender: Option<usize>, args: &CommandArgs) {
    if !gm.config.private_messages && sender.is_some() {
        gm.print_opt(sender, "Sorry, but private messages have been disabled");
        return;
    }

    if let Some(slot) = sender {
        if flood::flood_limited(gm, slot) {
            gm.print(slot, FLOOD_NOTICE);
            return;
        }
    }

    let mut cmd = args.say_argv(0).unwrap_or_default();
    let mut skipargs = 0;
    if cmd.eq_ignore_ascii_case("say") || cmd.eq_ignore_ascii_case("say_team") {
        skipargs = 1;
        cmd = args.say_argv(1).unwrap_or_default();
    }
    if args.say_argc() < 3 + skipargs {
        gm.print_opt(sender, format!("usage: {cmd} [name|slot#] [message]"));
        return;
    }

    let team_only = cmd.eq_ignore_ascii_case("mt") || cmd.eq_ignore_ascii_case("/mt");
    let token = args.say_argv(1 + skipargs).unwrap_or_default();
    let text = args.say_concat(2 + skipargs);
    let body_color = if team_only { color::CYAN } else { color::YELLOW };

    let candidates = resolver::find_clients(gm.ctx, &token);
    let mut recipients = Vec::new();
    let mut ignored = Vec::new();
    for target in candidates {
        if let Some(slot) = sender {
            if team_only && !gm.ctx.on_same_team(slot, target) {
                continue;
            }
            if gm.ctx.clients[target].ignore.contains(slot) {
                ignored.push(target);
                continue;
            }
        }
        recipients.push(target);
    }

    let sender_name = match sender {
        Some(s) => gm.client_name(s),
        None => "console".to_string(),
    };

    if token.eq_ignore_ascii_case("console") {
        gm.print_opt(sender, format!("^{body_color}Private message: ^7{text}"));
        gm.print_opt(sender, format!("^{body_color}sent to Console."));
        info!(mode = "privmsg", from = %sender_name, to = "console", %text);
        return;
    }

    let count = recipients.len();
    for &target in &recipients {
        let name = format!("{sender_name}^{body_color} -> ^7{token}^7: ({count} recipients): ");
        gm.engine.send(
            target,
            ServerMsg::Chat {
                kind: ChatKind::Chat,
                from: sender,
                name,
                color: body_color,
                text: text.clone(),
                skip_notify: false,
            },
        );
        gm.engine.send(
            target,
            ServerMsg::CenterPrint {
                text: format!("^{body_color}private message from ^7{sender_name}^7"),
            },
        );
    }

    if recipients.is_empty() {
        gm.print_opt(
            sender,
            format!("^3No player matching ^7'{token}^7' ^3to send message to."),
        );
    } else {
        let names: Vec<String> = recipients.iter().map(|&t| gm.client_name(t)).collect();
        if sender.is_some() {
            gm.print_opt(sender, format!("^{body_color}Private message: ^7{text}"));
        }
        let plural = if count == 1 { "" } else { "s" };
        gm.print_opt(
            sender,
            format!("^{body_color}sent to {count} player{plural}: ^7{}", names.join("^7, ")),
        );
        info!(
            mode = if team_only { "tprivmsg" } else { "privmsg" },
            from = %sender_name,
            to = %token,
            %text
        );
    }

    if !ignored.is_empty() {
        let names: Vec<String> = ignored.iter().map(|&t| gm.client_name(t)).collect();
        let plural = if ignored.len() == 1 { "" } else { "s" };
        gm.print_opt(
            sender,
            format!(
                "^{body_color}ignored by {} player{plural}: ^7{}",
                ignored.len(),
                names.join("^7, ")
            ),
        );
    }
}

pub fn cmd_private_message(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    private_message(gm, Some(slot), args);
}

/// Range of area chat, world units in every axis.
const AREA_CHAT_RANGE: f32 = 1000.0;

/// `say_area <message>`: team chat limited to clients near the sender.
pub fn cmd_say_area(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    if flood::flood_limited(gm, slot) {
        gm.print(slot, FLOOD_NOTICE);
        return;
    }

    let text = args.concat(1);
    if text.is_empty() {
        return;
    }
    let text: String = text.chars().take(MAX_SAY_TEXT).collect();

    let prefix = scope_prefix(gm, Some(slot));
    let sender_name = gm.client_name(slot);
    info!(mode = "sayarea", from = %sender_name, %text);
    let name = format!("<{sender_name}^7> ");

    let origin = gm.engine.client_origin(slot);
    let mins = [origin[0] - AREA_CHAT_RANGE, origin[1] - AREA_CHAT_RANGE, origin[2] - AREA_CHAT_RANGE];
    let maxs = [origin[0] + AREA_CHAT_RANGE, origin[1] + AREA_CHAT_RANGE, origin[2] + AREA_CHAT_RANGE];
    let nearby = gm.engine.clients_in_box(mins, maxs);
    for recipient in nearby {
        if recipient < gm.ctx.clients.len() {
            say_to(gm, Some(slot), recipient, ChatMode::Team, color::BLUE, &name, &text, prefix);
        }
    }

    // spectators with the allchat capability hear it regardless of range
    for recipient in 0..gm.ctx.clients.len() {
        let is_spec = gm.ctx.client(recipient).is_some_and(|c| c.team == Team::None);
        if is_spec && gm.admin.has_capability(recipient, Capability::SpecAllChat) {
            say_to(gm, Some(slot), recipient, ChatMode::Team, color::BLUE, &name, &text, prefix);
        }
    }
}

/// `ignore`/`unignore <name|slot>`: maintain the caller's ignore list.
/// Ignored players' chat still arrives, but flagged so the client
/// suppresses the notification.
pub fn cmd_ignore(gm: &mut GameModule, slot: usize, args: &CommandArgs) {
    let cmd = args.argv(0).to_ascii_lowercase();
    let adding = cmd == "ignore";

    if args.argc() < 2 {
        gm.print(slot, format!("{cmd}: usage \\{cmd} [clientNum | partial name match]"));
        return;
    }

    let token = args.concat(1);
    let matches = resolver::find_clients(gm.ctx, &token);
    if matches.is_empty() {
        gm.print(slot, format!("{cmd}: no clients match the name '{token}'"));
        return;
    }

    for target in matches {
        let target_name = gm.client_name(target);
        let listed = gm.ctx.clients[slot].ignore.contains(target);
        if adding {
            if listed {
                gm.print(slot, format!("ignore: {target_name}^7 is already on your ignore list"));
            } else {
                gm.ctx.clients[slot].ignore.insert(target);
                gm.print(slot, format!("ignore: added {target_name}^7 to your ignore list"));
            }
        } else if listed {
            gm.ctx.clients[slot].ignore.remove(target);
            gm.print(slot, format!("unignore: removed {target_name}^7 from your ignore list"));
        } else {
            gm.print(slot, format!("unignore: {target_name}^7 is not on your ignore list"));
        }
    }
}

/// Console-origin center-print announcement. A leading `-rbs` group limits
/// the audience to the named teams; text is escape-decoded and wrapped at
/// 50 columns. Admins on an excluded team still get a plain print.
pub fn announce(gm: &mut GameModule, raw: &str) {
    let decoded = strutil::decode_escapes(raw);
    let mut text = decoded.trim_start();

    let mut send_red = true;
    let mut send_blue = true;
    let mut send_spec = true;
    let mut prefixes = String::new();

    if let Some(rest) = text.strip_prefix('-') {
        send_red = false;
        send_blue = false;
        send_spec = false;
        let (flags, body) = rest.split_once(' ').unwrap_or((rest, ""));
        for c in flags.chars() {
            match c.to_ascii_lowercase() {
                'r' if !send_red => {
                    send_red = true;
                    prefixes.push_str("[R]");
                }
                'b' if !send_blue => {
                    send_blue = true;
                    prefixes.push_str("[B]");
                }
                's' if !send_spec => {
                    send_spec = true;
                    prefixes.push_str("[S]");
                }
                _ => {}
            }
        }
        text = body;
    }

    if text.is_empty() {
        return;
    }

    let wrapped = strutil::word_wrap(text, 50);
    info!(mode = "announce", %text);

    for slot in 0..gm.ctx.clients.len() {
        let Some(cl) = gm.ctx.client(slot) else {
            continue;
        };
        let excluded = match cl.team {
            Team::Red => !send_red,
            Team::Blue => !send_blue,
            Team::None => !send_spec,
        };
        if excluded {
            if gm.admin.has_capability(slot, Capability::AdminChat) {
                gm.print(
                    slot,
                    format!("^6[Admins]^7 announcement to other team{prefixes}: {text}"),
                );
            }
            continue;
        }
        gm.engine.send(slot, ServerMsg::CenterPrint { text: wrapped.clone() });
        gm.print(slot, format!("console^7 announcement{prefixes}: {text}"));
    }
}
