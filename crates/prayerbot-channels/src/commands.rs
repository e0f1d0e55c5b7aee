//! Chat commands: extraction from incoming messages, parsing and execution.
//!
//! Every reply goes back as an ephemeral message to the user who asked.
//! `NotFound` and `Validation` errors turn into friendly replies, as does any
//! other error that is not fatal. Fatal errors are returned to the caller,
//! which stops the bot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prayerbot_core::error::{PrayerError, Result};
use prayerbot_core::traits::MessagingGateway;
use prayerbot_core::types::{BotIdentity, IncomingMessage};
use prayerbot_scheduler::clock::ScheduleClock;
use prayerbot_scheduler::engine::{TriggerEngine, TriggerReport, TriggerResult};
use prayerbot_scheduler::roster::RosterStore;
use prayerbot_scheduler::schedule::{Schedule, parse_weekday, weekday_name};

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Signup(Option<String>),
    /// `None` means every group.
    Stop(Option<String>),
    List,
    /// Raw arguments after `schedule`; validated on execution.
    Schedule(Vec<String>),
    /// `None` means every group.
    Groups(Option<String>),
    /// `None` means every group.
    Trigger(Option<String>),
    Unknown(String),
}

impl Command {
    /// Parse command text such as `signup guys`. `None` for blank input.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let first = words.next()?.to_lowercase();
        let args: Vec<String> = words.map(String::from).collect();
        let arg = |i: usize| args.get(i).cloned();

        let command = match first.as_str() {
            "help" => Self::Help,
            "signup" => Self::Signup(arg(0)),
            "sign" => match args.first() {
                Some(up) if up.eq_ignore_ascii_case("up") => Self::Signup(arg(1)),
                _ => Self::Unknown(first),
            },
            "stop" => Self::Stop(arg(0)),
            "list" => Self::List,
            "schedule" => Self::Schedule(args),
            "groups" => Self::Groups(arg(0)),
            "trigger" | "create_chats" => Self::Trigger(arg(0)),
            _ => Self::Unknown(first),
        };
        Some(command)
    }

    fn requires_admin(&self) -> bool {
        matches!(self, Self::Schedule(_) | Self::Groups(_) | Self::Trigger(_))
    }
}

/// The text after the first bot mention, if `text` mentions the bot.
pub fn mention_command<'a>(text: &'a str, mention: &str) -> Option<&'a str> {
    text.split(mention).nth(1).map(str::trim)
}

/// Runs commands against the roster and the trigger engine.
pub struct CommandHandler {
    engine: Arc<TriggerEngine>,
    gateway: Arc<dyn MessagingGateway>,
    identity: BotIdentity,
    admin_users: Vec<String>,
}

impl CommandHandler {
    pub fn new(
        engine: Arc<TriggerEngine>,
        gateway: Arc<dyn MessagingGateway>,
        identity: BotIdentity,
        admin_users: Vec<String>,
    ) -> Self {
        Self {
            engine,
            gateway,
            identity,
            admin_users,
        }
    }

    fn store(&self) -> &RosterStore {
        self.engine.store()
    }

    fn clock(&self) -> &ScheduleClock {
        self.engine.clock()
    }

    /// Handle one incoming message: ignore it, or run the command and reply.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<()> {
        let Some(text) = self.command_text(message).await else {
            return Ok(());
        };
        let Some(command) = Command::parse(text) else {
            return Ok(());
        };

        tracing::info!("Handling command {command:?} from {}", message.user_id);
        let reply = self.execute(command, &message.user_id).await?;

        if let Err(e) = self
            .gateway
            .post_ephemeral(&message.channel_id, &message.user_id, &reply)
            .await
        {
            tracing::warn!("Could not reply to {}: {e}", message.user_id);
        }
        Ok(())
    }

    /// Mentions count anywhere; bare text only counts in a direct message.
    async fn command_text<'a>(&self, message: &'a IncomingMessage) -> Option<&'a str> {
        if let Some(text) = mention_command(&message.text, &self.identity.mention()) {
            return Some(text);
        }

        let is_direct = match message.is_direct {
            Some(is_direct) => is_direct,
            None => self
                .gateway
                .is_direct_message_channel(&message.channel_id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Could not look up channel {}: {e}", message.channel_id);
                    false
                }),
        };
        is_direct.then_some(message.text.trim())
    }

    /// Run `command` on behalf of `user` and produce the reply text.
    pub async fn execute(&self, command: Command, user: &str) -> Result<String> {
        if command.requires_admin()
            && !self.admin_users.is_empty()
            && !self.admin_users.iter().any(|u| u == user)
        {
            return Ok("Sorry, only prayer group admins can do that.".into());
        }

        match self.run(command, user).await {
            Ok(reply) => Ok(reply),
            Err(e) => self.error_reply(e),
        }
    }

    /// Reply text for a failed command, or the error itself when it is fatal.
    fn error_reply(&self, error: PrayerError) -> Result<String> {
        match error {
            PrayerError::NotFound(group) => Ok(format!(
                "I don't know a prayer group called *{group}*. Try `@{} groups`.",
                self.bot_name()
            )),
            PrayerError::Validation(reason) => Ok(format!("That didn't work: {reason}")),
            e if e.is_fatal() => Err(e),
            e => {
                tracing::warn!("Command failed: {e}");
                Ok("Sorry, something went wrong on my end. Please try again in a bit.".into())
            }
        }
    }

    fn bot_name(&self) -> &str {
        &self.identity.name
    }

    async fn run(&self, command: Command, user: &str) -> Result<String> {
        let bot = self.bot_name();
        match command {
            Command::Help => Ok(help_text(bot)),

            Command::Signup(None) => Ok(format!(
                "You need to give me a group name. Look at `@{bot} help`"
            )),
            Command::Signup(Some(group)) => {
                let count = self.store().add_member(&group, user)?;
                let mut reply = format!("Great, you've been added to the *{group}* prayer group!");
                if count == 1 {
                    reply.push_str(
                        "\nYou're the only one in this group for now; if you meant to join \
                         another group, make sure you spelled the group name correctly!",
                    );
                }
                Ok(reply)
            }

            Command::Stop(Some(group)) => {
                self.store().remove_member(&group, user)?;
                let mut reply = format!("You have been removed from the *{group}* prayer group.");
                let remaining = self.store().list_groups_for(user)?;
                if !remaining.is_empty() {
                    reply.push_str(&format!(
                        " You are still a part of the following prayer groups: *{}*",
                        remaining.join("*, *")
                    ));
                }
                Ok(reply)
            }
            Command::Stop(None) => {
                self.store().remove_member_from_all_groups(user)?;
                Ok("You have been removed from *all* prayer groups".into())
            }

            Command::List => {
                let groups = self.store().list_groups_for(user)?;
                if groups.is_empty() {
                    Ok(format!(
                        "You are not a part of any prayer groups. Use `@{bot} signup` to join \
                         some, or try `@{bot} help` to learn more!"
                    ))
                } else {
                    Ok(format!(
                        "You are a part of the following prayer groups: *{}*",
                        groups.join("*, *")
                    ))
                }
            }

            Command::Schedule(args) => self.run_schedule(&args),

            Command::Groups(Some(group)) => {
                let record = self.store().snapshot(&group)?;
                let members: Vec<String> =
                    record.members.iter().map(|m| format!("<@{m}>")).collect();
                Ok(format!(
                    "*{}*: {} member(s), {}\nMembers: {}\nLast paired up {}",
                    record.name,
                    record.members.len(),
                    self.describe_schedule(&record.schedule),
                    members.join(", "),
                    self.format_local(record.schedule.last_triggered_at),
                ))
            }
            Command::Groups(None) => {
                let groups = self.store().dump_groups()?;
                if groups.is_empty() {
                    return Ok("There are no prayer groups yet.".into());
                }
                let lines: Vec<String> = groups
                    .iter()
                    .map(|g| {
                        format!(
                            "*{}*: {} member(s), {}",
                            g.name,
                            g.members.len(),
                            self.describe_schedule(&g.schedule)
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }

            Command::Trigger(Some(group)) => {
                let result = self.engine.trigger_group(&group).await?;
                Ok(describe_trigger(&group, &result))
            }
            Command::Trigger(None) => {
                let results = self.engine.trigger_all().await?;
                if results.is_empty() {
                    return Ok("There are no prayer groups to pair up.".into());
                }
                let lines: Vec<String> = results
                    .iter()
                    .map(|(group, result)| describe_trigger(group, result))
                    .collect();
                Ok(lines.join("\n"))
            }

            Command::Unknown(_) => Ok(format!(
                "Sorry, I don't know what that means. Try `@{bot} help`"
            )),
        }
    }

    fn run_schedule(&self, args: &[String]) -> Result<String> {
        let [group, weeks, day, hour] = args else {
            return Ok(format!(
                "Usage: `@{bot} schedule <group> <weeks> <day> <hour>`, \
                 e.g. `@{bot} schedule guys 2 friday 18`",
                bot = self.bot_name()
            ));
        };

        let weeks: u32 = weeks
            .parse()
            .map_err(|_| PrayerError::Validation(format!("'{weeks}' is not a number of weeks")))?;
        let hour: u32 = hour
            .parse()
            .map_err(|_| PrayerError::Validation(format!("'{hour}' is not an hour (0-23)")))?;
        let weekday = parse_weekday(day)?;

        let schedule = self.store().set_schedule(group, weeks, weekday, hour)?;
        Ok(format!(
            "The *{group}* prayer group is now paired up {}",
            self.describe_schedule(&schedule)
        ))
    }

    fn describe_schedule(&self, schedule: &Schedule) -> String {
        let every = match schedule.recurrence_weeks {
            1 => "every week".to_string(),
            n => format!("every {n} weeks"),
        };
        format!(
            "{every} on {} at {:02}:00, next on {}",
            weekday_name(schedule.trigger_weekday),
            schedule.trigger_hour,
            self.format_local(self.clock().next_due(schedule)),
        )
    }

    fn format_local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.clock().offset())
            .format("%a %m/%d/%Y %H:%M")
            .to_string()
    }
}

fn describe_trigger(group: &str, result: &TriggerResult) -> String {
    match result {
        TriggerResult::Skipped { .. } => {
            format!("The *{group}* prayer group is too lonely to pair up.")
        }
        TriggerResult::Triggered(TriggerReport {
            attempted,
            succeeded,
            failed,
            ..
        }) => {
            let mut line =
                format!("Paired up *{group}*: opened {succeeded} of {attempted} group chats.");
            if *failed > 0 {
                line.push_str(&format!(" {failed} could not be opened, see the logs."));
            }
            line
        }
    }
}

fn help_text(bot: &str) -> String {
    format!(
        "Hello There!  My name is `@{bot}`, and I exist to help organize prayer groups.  \
You can interact with me using the following commands:

-  `help`: Print out this help message.

-  `signup group`: Sign up to be a part of prayer group `<group>`. Example:
> *@{bot} signup LWGuys*
This will put you into the prayer rotations for that group, where you will be randomly matched \
with other members to pray for each other.

-  `stop group`: The reverse of the above command; this will take you out of a group you \
previously signed up for.

-  `stop`: If you don't give me a group name, I'll just remove you from all groups you were a part of.

-  `list`: List all groups you're in.

-  `schedule group weeks day hour`: Change how often a group is paired up. Example:
> *@{bot} schedule LWGuys 2 friday 18*

-  `groups`: Show every group with its members count and schedule.

-  `groups group`: Show one group's members and schedule.

-  `trigger group`: Pair a group up right now. Without a group name, pair up every group.

When you are a part of a prayer group, I will randomly pair its participants up into prayer \
buddies on the group's schedule, once a week on Wednesday nights unless changed."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records ephemeral replies and opened conversations.
    #[derive(Default)]
    struct MockGateway {
        replies: Mutex<Vec<(String, String, String)>>,
        conversations: Mutex<Vec<Vec<String>>>,
        direct_lookups: Mutex<usize>,
    }

    #[async_trait]
    impl MessagingGateway for MockGateway {
        async fn resolve_display_name(&self, user_id: &str) -> String {
            user_id.to_lowercase()
        }

        async fn is_direct_message_channel(&self, channel_id: &str) -> Result<bool> {
            *self.direct_lookups.lock().unwrap() += 1;
            Ok(channel_id.starts_with('D'))
        }

        async fn create_private_conversation(&self, user_ids: &[String]) -> Result<String> {
            self.conversations.lock().unwrap().push(user_ids.to_vec());
            Ok("G1".into())
        }

        async fn post_message(&self, _conversation_id: &str, _text: &str) -> Result<()> {
            Ok(())
        }

        async fn post_ephemeral(&self, channel_id: &str, user_id: &str, text: &str) -> Result<()> {
            self.replies
                .lock()
                .unwrap()
                .push((channel_id.into(), user_id.into(), text.into()));
            Ok(())
        }

        async fn leave_conversation(&self, _conversation_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn setup(admins: &[&str]) -> (CommandHandler, Arc<MockGateway>, Arc<RosterStore>) {
        let store = Arc::new(RosterStore::open_in_memory().unwrap());
        let gateway = Arc::new(MockGateway::default());
        let engine = Arc::new(TriggerEngine::new(
            store.clone(),
            gateway.clone(),
            ScheduleClock::utc(),
            "prayerbot",
        ));
        let identity = BotIdentity {
            user_id: "UBOT".into(),
            name: "prayerbot".into(),
        };
        let admins = admins.iter().map(|a| a.to_string()).collect();
        let handler = CommandHandler::new(engine, gateway.clone(), identity, admins);
        (handler, gateway, store)
    }

    fn msg(channel: &str, user: &str, text: &str, is_direct: Option<bool>) -> IncomingMessage {
        IncomingMessage {
            channel_id: channel.into(),
            user_id: user.into(),
            text: text.into(),
            is_direct,
        }
    }

    fn last_reply(gateway: &MockGateway) -> String {
        gateway.replies.lock().unwrap().last().unwrap().2.clone()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse("  HELP me"), Some(Command::Help));
        assert_eq!(
            Command::parse("signup LWGuys"),
            Some(Command::Signup(Some("LWGuys".into())))
        );
        assert_eq!(Command::parse("signup"), Some(Command::Signup(None)));
        assert_eq!(Command::parse("stop"), Some(Command::Stop(None)));
        assert_eq!(Command::parse("stop guys"), Some(Command::Stop(Some("guys".into()))));
        assert_eq!(Command::parse("list"), Some(Command::List));
        assert_eq!(
            Command::parse("schedule guys 2 fri 18"),
            Some(Command::Schedule(vec![
                "guys".into(),
                "2".into(),
                "fri".into(),
                "18".into()
            ]))
        );
        assert_eq!(Command::parse("groups"), Some(Command::Groups(None)));
        assert_eq!(Command::parse("groups guys"), Some(Command::Groups(Some("guys".into()))));
        assert_eq!(Command::parse("create_chats"), Some(Command::Trigger(None)));
        assert_eq!(Command::parse("trigger guys"), Some(Command::Trigger(Some("guys".into()))));
        assert_eq!(Command::parse("dance"), Some(Command::Unknown("dance".into())));
        assert_eq!(Command::parse("   "), None);
    }

    #[test]
    fn test_parse_sign_up_two_words() {
        assert_eq!(
            Command::parse("sign up foo"),
            Some(Command::Signup(Some("foo".into())))
        );
        assert_eq!(Command::parse("Sign Up"), Some(Command::Signup(None)));
        assert_eq!(Command::parse("sign here"), Some(Command::Unknown("sign".into())));
    }

    #[test]
    fn test_mention_command() {
        assert_eq!(mention_command("<@UBOT> signup guys", "<@UBOT>"), Some("signup guys"));
        assert_eq!(mention_command("hey <@UBOT>   list ", "<@UBOT>"), Some("list"));
        assert_eq!(mention_command("<@UBOT>", "<@UBOT>"), Some(""));
        assert_eq!(mention_command("signup guys", "<@UBOT>"), None);
    }

    #[tokio::test]
    async fn test_signup_via_mention() {
        let (handler, gateway, store) = setup(&[]);
        handler
            .handle_message(&msg("C1", "U1", "<@UBOT> signup Guys", None))
            .await
            .unwrap();

        assert_eq!(store.get_members("guys").unwrap(), vec!["U1".to_string()]);
        let replies = gateway.replies.lock().unwrap().clone();
        assert_eq!(replies[0].0, "C1");
        assert_eq!(replies[0].1, "U1");
        assert!(replies[0].2.starts_with("Great, you've been added to the *Guys* prayer group!"));
        assert!(replies[0].2.contains("You're the only one in this group for now"));
        // A mention never needs a channel lookup.
        assert_eq!(*gateway.direct_lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_signup_has_no_lonely_hint() {
        let (handler, gateway, store) = setup(&[]);
        store.add_member("guys", "U1").unwrap();
        handler
            .handle_message(&msg("D2", "U2", "signup guys", Some(true)))
            .await
            .unwrap();
        assert!(!last_reply(&gateway).contains("only one"));
    }

    #[tokio::test]
    async fn test_plain_text_only_handled_in_dm() {
        let (handler, gateway, store) = setup(&[]);
        handler
            .handle_message(&msg("C1", "U1", "signup guys", None))
            .await
            .unwrap();
        assert!(gateway.replies.lock().unwrap().is_empty());
        assert!(store.list_all_groups().unwrap().is_empty());

        handler
            .handle_message(&msg("D1", "U1", "signup guys", None))
            .await
            .unwrap();
        assert_eq!(store.list_all_groups().unwrap(), vec!["guys".to_string()]);
        assert_eq!(*gateway.direct_lookups.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_mention_is_ignored() {
        let (handler, gateway, _store) = setup(&[]);
        handler
            .handle_message(&msg("C1", "U1", "<@UBOT>", None))
            .await
            .unwrap();
        assert!(gateway.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signup_without_group() {
        let (handler, _gateway, _store) = setup(&[]);
        let reply = handler.execute(Command::Signup(None), "U1").await.unwrap();
        assert_eq!(reply, "You need to give me a group name. Look at `@prayerbot help`");
    }

    #[tokio::test]
    async fn test_stop_and_list() {
        let (handler, _gateway, store) = setup(&[]);
        store.add_member("guys", "U1").unwrap();
        store.add_member("choir", "U1").unwrap();
        store.add_member("choir", "U2").unwrap();

        let reply = handler.execute(Command::List, "U1").await.unwrap();
        assert_eq!(reply, "You are a part of the following prayer groups: *choir*, *guys*");

        let reply = handler
            .execute(Command::Stop(Some("guys".into())), "U1")
            .await
            .unwrap();
        assert_eq!(
            reply,
            "You have been removed from the *guys* prayer group. \
             You are still a part of the following prayer groups: *choir*"
        );
        assert!(store.get_members("guys").is_err());

        let reply = handler.execute(Command::Stop(None), "U1").await.unwrap();
        assert_eq!(reply, "You have been removed from *all* prayer groups");
        assert_eq!(store.get_members("choir").unwrap(), vec!["U2".to_string()]);

        let reply = handler.execute(Command::List, "U1").await.unwrap();
        assert!(reply.starts_with("You are not a part of any prayer groups."));
    }

    #[tokio::test]
    async fn test_schedule_command() {
        let (handler, _gateway, store) = setup(&[]);
        store.add_member("guys", "U1").unwrap();
        let before = store.get_schedule("guys").unwrap();

        let args = ["guys", "2", "friday", "18"].map(String::from).to_vec();
        let reply = handler.execute(Command::Schedule(args), "U1").await.unwrap();
        assert!(reply.contains("every 2 weeks on Friday at 18:00"), "{reply}");

        let after = store.get_schedule("guys").unwrap();
        assert_eq!(after.recurrence_weeks, 2);
        assert_eq!(after.trigger_weekday, chrono::Weekday::Fri);
        assert_eq!(after.trigger_hour, 18);
        assert_eq!(after.last_triggered_at, before.last_triggered_at);
    }

    #[tokio::test]
    async fn test_schedule_errors_become_replies() {
        let (handler, _gateway, store) = setup(&[]);
        store.add_member("guys", "U1").unwrap();
        let schedule = |a: [&str; 4]| Command::Schedule(a.map(String::from).to_vec());

        let reply = handler.execute(schedule(["guys", "2", "fri", "24"]), "U1").await.unwrap();
        assert!(reply.starts_with("That didn't work"), "{reply}");

        let reply = handler.execute(schedule(["guys", "two", "fri", "18"]), "U1").await.unwrap();
        assert!(reply.contains("'two' is not a number of weeks"));

        let reply = handler.execute(schedule(["ghost", "1", "fri", "18"]), "U1").await.unwrap();
        assert!(reply.contains("*ghost*"));

        let reply = handler
            .execute(Command::Schedule(vec!["guys".into()]), "U1")
            .await
            .unwrap();
        assert!(reply.starts_with("Usage:"));
        assert_eq!(store.get_schedule("guys").unwrap().trigger_hour, 23);
    }

    #[tokio::test]
    async fn test_admin_commands_restricted() {
        let (handler, _gateway, store) = setup(&["UADMIN"]);
        store.add_member("guys", "U1").unwrap();

        let reply = handler.execute(Command::Groups(None), "U1").await.unwrap();
        assert_eq!(reply, "Sorry, only prayer group admins can do that.");
        let reply = handler
            .execute(Command::Groups(Some("guys".into())), "U1")
            .await
            .unwrap();
        assert_eq!(reply, "Sorry, only prayer group admins can do that.");

        let reply = handler.execute(Command::Groups(None), "UADMIN").await.unwrap();
        assert!(reply.starts_with("*guys*: 1 member(s), every week on Wednesday at 23:00"));

        // Member commands stay open to everyone.
        let reply = handler.execute(Command::List, "U1").await.unwrap();
        assert!(reply.contains("*guys*"));
    }

    #[tokio::test]
    async fn test_groups_command_for_one_group() {
        let (handler, _gateway, store) = setup(&[]);
        store.add_member("Guys", "U1").unwrap();
        store.add_member("guys", "U2").unwrap();
        store.add_member("choir", "U3").unwrap();
        let last = store.get_schedule("guys").unwrap().last_triggered_at;

        let reply = handler
            .execute(Command::Groups(Some("GUYS".into())), "U1")
            .await
            .unwrap();
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines.len(), 3, "{reply}");
        assert!(lines[0].starts_with("*guys*: 2 member(s), every week on Wednesday at 23:00"));
        assert_eq!(lines[1], "Members: <@U1>, <@U2>");
        assert_eq!(
            lines[2],
            format!("Last paired up {}", last.format("%a %m/%d/%Y %H:%M"))
        );
        assert!(!reply.contains("U3"));

        let reply = handler
            .execute(Command::Groups(Some("ghost".into())), "U1")
            .await
            .unwrap();
        assert!(reply.contains("I don't know a prayer group called *ghost*"));
    }

    #[tokio::test]
    async fn test_only_fatal_errors_escape_execute() {
        let (handler, _gateway, _store) = setup(&[]);

        let reply = handler
            .error_reply(PrayerError::Gateway("conversations.open: ratelimited".into()))
            .unwrap();
        assert_eq!(reply, "Sorry, something went wrong on my end. Please try again in a bit.");
        let reply = handler
            .error_reply(PrayerError::Config("bad offset".into()))
            .unwrap();
        assert!(reply.starts_with("Sorry, something went wrong"));
        let reply = handler
            .error_reply(PrayerError::Validation("hour 24 is out of range".into()))
            .unwrap();
        assert_eq!(reply, "That didn't work: hour 24 is out of range");

        let err = handler
            .error_reply(PrayerError::Store("database is locked".into()))
            .unwrap_err();
        assert!(matches!(err, PrayerError::Store(_)));
        let err = handler
            .error_reply(std::io::Error::other("disk gone").into())
            .unwrap_err();
        assert!(matches!(err, PrayerError::Io(_)));
    }

    #[tokio::test]
    async fn test_trigger_command() {
        let (handler, gateway, store) = setup(&[]);
        store.add_member("guys", "U1").unwrap();
        store.add_member("guys", "U2").unwrap();
        store.add_member("solo", "U3").unwrap();

        let reply = handler
            .execute(Command::Trigger(Some("guys".into())), "U1")
            .await
            .unwrap();
        assert_eq!(reply, "Paired up *guys*: opened 1 of 1 group chats.");
        assert_eq!(gateway.conversations.lock().unwrap().len(), 1);

        let reply = handler.execute(Command::Trigger(None), "U1").await.unwrap();
        assert!(reply.contains("*solo* prayer group is too lonely"));

        let reply = handler
            .execute(Command::Trigger(Some("ghost".into())), "U1")
            .await
            .unwrap();
        assert!(reply.contains("I don't know a prayer group called *ghost*"));
    }

    #[tokio::test]
    async fn test_unknown_and_help() {
        let (handler, _gateway, _store) = setup(&[]);
        let reply = handler
            .execute(Command::Unknown("dance".into()), "U1")
            .await
            .unwrap();
        assert_eq!(reply, "Sorry, I don't know what that means. Try `@prayerbot help`");

        let help = handler.execute(Command::Help, "U1").await.unwrap();
        assert!(help.contains("`@prayerbot`"));
        assert!(help.contains("signup group"));
    }
}
