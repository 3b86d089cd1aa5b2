//! The catalog of named API operations.
//!
//! Two kinds of entries live here:
//!
//! - the routing table: friendly names mapped to `(module, action)` pairs,
//!   for callers that just want the default envelope of a known operation
//! - descriptors with a field contract, used by the game flows
//!
//! Entries are plain data. Nothing here talks to the network.

use sifemu_protocol::{ACTION, COMMAND_NUM, MODULE, RequestDescriptor, TIME_STAMP};

/// Friendly name → `(module, action)`.
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("auth_key", "login", "authkey"),
    ("login", "login", "login"),
    ("user_info", "user", "userInfo"),
    ("personal_notice", "personalnotice", "get"),
    ("tos", "tos", "tosCheck"),
    ("agree_tos", "tos", "tosAgree"),
    ("is_connected_llaccount", "platformAccount", "isConnectedLlAccount"),
    ("lbonus", "lbonus", "execute"),
    ("handover_start", "handover", "start"),
    ("handover_exec", "handover", "exec"),
    ("reward_list", "reward", "rewardList"),
    ("event_player_rank", "ranking", "eventPlayer"),
    ("general_player_rank", "ranking", "player"),
    ("friend_variety", "notice", "noticeFriendVariety"),
    ("friend_greetings", "notice", "noticeFriendGreeting"),
    ("friend_greetings_from_user", "notice", "noticeUserGreetingHistory"),
    ("secretbox_list", "secretbox", "all"),
    ("secretbox_pull", "secretbox", "pon"),
    ("unit_merge", "unit", "merge"),
    ("unit_sale", "unit", "sale"),
    ("unit_rankup", "unit", "rankUp"),
    ("unit_favorite", "unit", "favorite"),
    ("product_list", "payment", "productList"),
    ("background_list", "background", "set"),
    ("award_set", "award", "set"),
    ("unaccomplished_achievement", "achievement", "unaccomplishList"),
    ("payment_month", "payment", "month"),
    ("payment_monthly_history", "payment", "history"),
    ("live_friend_list", "live", "partyList"),
    ("live_deck_list", "live", "deckList"),
    ("live_start", "live", "play"),
    ("live_finish", "live", "reward"),
];

/// Routes whose operations carry a field contract.
const DESCRIBED: &[(&str, fn() -> RequestDescriptor)] = &[
    ("auth_key", auth_key),
    ("login", login),
    ("user_info", user_info),
    ("personal_notice", personal_notice),
    ("tos", tos_check),
    ("agree_tos", tos_agree),
    ("is_connected_llaccount", is_connected_account),
    ("lbonus", login_bonus),
    ("handover_start", handover_start),
    ("handover_exec", handover_exec),
    ("reward_list", reward_list),
    ("event_player_rank", ranking_event_player),
    ("secretbox_list", secretbox_all),
    ("secretbox_pull", secretbox_pon),
    ("unit_merge", unit_merge),
    ("unit_sale", unit_sale),
    ("unit_rankup", unit_rank_up),
];

/// Looks up a routing-table entry by its friendly name.
///
/// Operations with a known field contract come back with it; the rest get
/// the default envelope only.
pub fn lookup(name: &str) -> Option<RequestDescriptor> {
    if let Some((_, describe)) = DESCRIBED.iter().find(|(route, _)| *route == name) {
        return Some(describe());
    }
    ROUTES
        .iter()
        .find(|(route, _, _)| *route == name)
        .map(|(_, module, action)| RequestDescriptor::new(*module, *action))
}

/// The calls a freshly logged-in client batches to populate its state.
pub const STARTUP_BUNDLE: &[(&str, &str)] = &[
    ("login", "topInfo"),
    ("live", "liveStatus"),
    ("live", "schedule"),
    ("marathon", "marathonInfo"),
    ("login", "topInfoOnce"),
    ("unit", "unitAll"),
    ("unit", "deckInfo"),
    ("payment", "productList"),
    ("scenario", "scenarioStatus"),
    ("subscenario", "subscenarioStatus"),
    ("user", "showAllItem"),
    ("battle", "battleInfo"),
    ("banner", "bannerList"),
    ("notice", "noticeMarquee"),
    ("festival", "festivalInfo"),
    ("eventscenario", "status"),
    ("navigation", "specialCutin"),
    ("album", "albumAll"),
    ("award", "awardInfo"),
    ("background", "backgroundInfo"),
    ("online", "info"),
    ("challenge", "challengeInfo"),
];

/// The complete unit and deck listing.
pub const UNIT_AND_DECK: &[(&str, &str)] = &[("unit", "unitAll"), ("unit", "deckInfo")];

/// The webview path of an in-game page, e.g. `announce`.
pub fn webview_path(page: &str) -> String {
    format!("/webview.php/{page}/index?0=")
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Issues the pre-login authorization token. Sent without a body.
pub fn auth_key() -> RequestDescriptor {
    RequestDescriptor::new("login", "authkey")
}

/// The credential-only body shared by the login endpoints.
fn credential_call(action: &str) -> RequestDescriptor {
    RequestDescriptor::new("login", action)
        .requires(["login_key", "login_passwd"])
        .excludes([MODULE, ACTION, TIME_STAMP, COMMAND_NUM])
}

pub fn login() -> RequestDescriptor {
    credential_call("login")
}

/// Registers a fresh credential pair.
pub fn start_up() -> RequestDescriptor {
    credential_call("startUp")
}

/// Creates the account behind freshly registered credentials.
pub fn start_without_invite() -> RequestDescriptor {
    credential_call("startWithoutInvite")
}

pub fn user_info() -> RequestDescriptor {
    RequestDescriptor::new("user", "userInfo")
}

pub fn personal_notice() -> RequestDescriptor {
    RequestDescriptor::new("personalnotice", "get")
}

pub fn tos_check() -> RequestDescriptor {
    RequestDescriptor::new("tos", "tosCheck")
}

pub fn tos_agree() -> RequestDescriptor {
    RequestDescriptor::new("tos", "tosAgree").requires(["tos_id"])
}

/// Sent as a bare `module`/`action` pair with no stamped slots.
pub fn is_connected_account() -> RequestDescriptor {
    RequestDescriptor::new("platformAccount", "isConnectedLlAccount")
        .excludes([TIME_STAMP, COMMAND_NUM])
}

pub fn login_bonus() -> RequestDescriptor {
    RequestDescriptor::new("lbonus", "execute")
}

pub fn handover_start() -> RequestDescriptor {
    RequestDescriptor::new("handover", "start")
}

pub fn handover_exec() -> RequestDescriptor {
    RequestDescriptor::new("handover", "exec").requires(["handover"])
}

// ---------------------------------------------------------------------------
// New-account setup
// ---------------------------------------------------------------------------

/// Nicknames a fresh account picks from when none is given.
pub const DEFAULT_NAMES: &[&str] = &[
    "幻の学院生",
    "明るい学院生",
    "期待の学院生",
    "純粋な学院生",
    "素直な学院生",
    "元気な学院生",
    "天然な学院生",
    "勇敢な学院生",
    "気になる学院生",
    "真面目な学院生",
    "不思議な学院生",
    "癒し系な学院生",
    "心優しい学院生",
    "さわやかな学院生",
    "頼りになる学院生",
    "さすらいの学院生",
    "正義感あふれる学院生",
    "カラオケ好きの学院生",
];

pub fn change_name() -> RequestDescriptor {
    RequestDescriptor::new("user", "changeName").requires(["name"])
}

/// Reported even when the tutorial is skipped.
pub fn tutorial_progress() -> RequestDescriptor {
    RequestDescriptor::new("tutorial", "progress").requires(["tutorial_state"])
}

pub fn tutorial_skip() -> RequestDescriptor {
    RequestDescriptor::new("tutorial", "skip")
}

/// The starting units a new account chooses its leader from.
pub fn login_unit_list() -> RequestDescriptor {
    RequestDescriptor::new("login", "unitList")
}

pub fn login_unit_select() -> RequestDescriptor {
    RequestDescriptor::new("login", "unitSelect").requires(["unit_initial_set_id"])
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Practice: feeds `unit_owning_user_ids` into the base card.
pub fn unit_merge() -> RequestDescriptor {
    RequestDescriptor::new("unit", "merge")
        .requires(["base_owning_unit_user_id", "unit_owning_user_ids"])
}

/// Idolization: same body as a merge, with a single partner.
pub fn unit_rank_up() -> RequestDescriptor {
    RequestDescriptor::new("unit", "rankUp")
        .requires(["base_owning_unit_user_id", "unit_owning_user_ids"])
}

/// Sells every card in `unit_owning_user_id` (a list, despite the name).
pub fn unit_sale() -> RequestDescriptor {
    RequestDescriptor::new("unit", "sale").requires(["unit_owning_user_id"])
}

// ---------------------------------------------------------------------------
// Present box
// ---------------------------------------------------------------------------

/// The present box listing. `incentive_id` pages further down a category.
pub fn reward_list() -> RequestDescriptor {
    RequestDescriptor::new("reward", "rewardList")
        .requires(["order", "filter", "category"])
        .options(["incentive_id"])
}

/// The present box categories the client lists on opening it.
pub const REWARD_CATEGORIES: [i64; 3] = [0, 1, 2];

pub fn reward_open() -> RequestDescriptor {
    RequestDescriptor::new("reward", "open").requires(["incentive_id"])
}

// ---------------------------------------------------------------------------
// Scouting
// ---------------------------------------------------------------------------

/// Every scouting tab currently offered.
pub fn secretbox_all() -> RequestDescriptor {
    RequestDescriptor::new("secretbox", "all")
}

pub fn secretbox_pon() -> RequestDescriptor {
    RequestDescriptor::new("secretbox", "pon").requires(["cost_priority", "secret_box_id"])
}

pub fn secretbox_multi() -> RequestDescriptor {
    RequestDescriptor::new("secretbox", "multi")
        .requires(["count", "cost_priority", "secret_box_id"])
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// One page of an event ranking, jumping straight to `rank`.
pub fn ranking_event_player() -> RequestDescriptor {
    RequestDescriptor::new("ranking", "eventPlayer")
        .requires(["buff", "limit", "event_child_id", "rank"])
}
