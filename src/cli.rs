// Copyright (c) 2025 Pocketledger Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn tx_payload_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("type")
            .long("type")
            .required(true)
            .value_parser([
                "expense",
                "income",
                "transfer",
                "lent",
                "borrowed",
                "paid-loan",
                "collected-debt",
            ]),
    )
    .arg(Arg::new("title").long("title").required(true))
    .arg(Arg::new("amount").long("amount").required(true))
    .arg(Arg::new("note").long("note"))
    .arg(
        Arg::new("date")
            .long("date")
            .help("YYYY-MM-DD or 'YYYY-MM-DD HH:MM' (default: now)"),
    )
    .arg(Arg::new("account").long("account").help("Account name"))
    .arg(Arg::new("category").long("category").help("Category name"))
    .arg(Arg::new("from").long("from").help("Transfer source account"))
    .arg(Arg::new("to").long("to").help("Transfer destination account"))
    .arg(
        Arg::new("rate")
            .long("rate")
            .help("Transfer exchange rate (default: cached rate for the pair)"),
    )
    .arg(Arg::new("due").long("due").help("Loan due date YYYY-MM-DD"))
    .arg(
        Arg::new("loan")
            .long("loan")
            .value_parser(value_parser!(i64))
            .help("Loan transaction id being repaid"),
    )
}

pub fn build_cli() -> Command {
    Command::new("pocketledger")
        .about("Multi-currency personal finance ledger")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(false)
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(Arg::new("color").long("color").default_value("#4477aa")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("set-main").arg(Arg::new("name").required(true)))
                .subcommand(Command::new("rm").arg(Arg::new("name").required(true))),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .value_parser(["expense", "income"])
                                .help("Restrict to one side; omit for both"),
                        )
                        .arg(Arg::new("color").long("color").default_value("#44aa77"))
                        .arg(Arg::new("icon").long("icon").default_value("🏷️")),
                )
                .subcommand(Command::new("list"))
                .subcommand(Command::new("rm").arg(Arg::new("name").required(true))),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and inspect transactions")
                .subcommand(tx_payload_args(Command::new("add")))
                .subcommand(tx_payload_args(
                    Command::new("edit").arg(
                        Arg::new("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ))
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(Arg::new("account").long("account"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage budgets")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(
                            Arg::new("period")
                                .long("period")
                                .required(true)
                                .value_parser(["weekly", "monthly", "yearly"]),
                        )
                        .arg(
                            Arg::new("accounts")
                                .long("accounts")
                                .required(true)
                                .help("Comma-separated account names"),
                        )
                        .arg(
                            Arg::new("categories")
                                .long("categories")
                                .required(true)
                                .help("Comma-separated category names"),
                        )
                        .arg(Arg::new("color").long("color").default_value("#aa7744")),
                )
                .subcommand(Command::new("list"))
                .subcommand(json_flags(
                    Command::new("report").arg(Arg::new("name").long("name")),
                )),
        )
        .subcommand(
            Command::new("loan")
                .about("Track lent/borrowed money")
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("progress").arg(
                        Arg::new("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("chart")
                .about("Aggregated chart data")
                .subcommand(json_flags(
                    Command::new("categories")
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(Arg::new("month").long("month").help("YYYY-MM")),
                ))
                .subcommand(json_flags(
                    Command::new("loans")
                        .arg(Arg::new("currency").long("currency").required(true)),
                )),
        )
        .subcommand(
            Command::new("fx")
                .about("Exchange rates")
                .subcommand(
                    Command::new("fetch")
                        .arg(Arg::new("base").long("base").help(
                            "Base currency to refresh (default: every account currency)",
                        )),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("convert")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ),
        )
        .subcommand(
            Command::new("import").about("Bulk import").subcommand(
                Command::new("transactions")
                    .arg(Arg::new("path").long("path").required(true)),
            ),
        )
}
