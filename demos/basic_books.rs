//! Basic bookkeeping example: chart of accounts, entries, statements and a
//! bank reconciliation

use bigdecimal::BigDecimal;
use bookkeeping_core::utils::MemoryStorage;
use bookkeeping_core::{
    init_tracing, patterns, BankDirection, BankMovement, CashFlowBucket, EngineConfig,
    IncomeBand, JournalEntryBuilder, Ledger, Period, PrefixTable, SaleWithTaxParams,
};
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("🧾 Bookkeeping Core - Basic Books Example\n");

    let config = EngineConfig::new("acme-pe");
    let mut ledger = Ledger::new(MemoryStorage::new(), config);

    // 1. Set up a chart of accounts
    println!("📊 Setting up Chart of Accounts...");
    ledger.setup_standard_chart_of_accounts().await?;
    let directory = ledger.directory().await?;
    for account in directory.iter() {
        let indent = "  ".repeat(account.level as usize);
        println!(
            "{}✓ {} {} ({})",
            indent, account.code, account.name, account.account_type
        );
    }
    println!();

    // 2. Record business transactions
    println!("💰 Recording Journal Entries...\n");
    let day = |m: u32, d: u32| NaiveDate::from_ymd_opt(2024, m, d).unwrap();

    let investment = patterns::owner_investment(
        ledger.next_entry_number().await?,
        day(1, 2),
        "Initial owner investment",
        "1041",
        "50",
        BigDecimal::from(20000),
    );
    ledger.record_entry(investment).await?;
    println!("  ✓ Recorded: Owner investment of 20,000");

    let sale = patterns::sale_with_tax(SaleWithTaxParams {
        number: ledger.next_entry_number().await?,
        date: day(3, 15),
        description: "Counter sale".to_string(),
        cash_account_id: "1011".to_string(),
        revenue_account_id: "7011".to_string(),
        tax_payable_account_id: "40111".to_string(),
        base_amount: BigDecimal::from(1000),
        tax_amount: BigDecimal::from(180),
    });
    ledger.record_entry(sale).await?;
    println!("  ✓ Recorded: Sale of 1,000 plus 180 sales tax");

    let van = JournalEntryBuilder::new(ledger.next_entry_number().await?, day(3, 25), "Delivery van")
        .reference("INV-2024-118")
        .debit("33", BigDecimal::from(4000))
        .credit("1041", BigDecimal::from(4000))
        .confirmed();
    let van = ledger.record_entry(van).await?;
    println!("  ✓ Recorded: Equipment purchase of 4,000");

    let rent = patterns::expense_payment(
        ledger.next_entry_number().await?,
        day(3, 28),
        "Warehouse services",
        "63",
        "1041",
        BigDecimal::from(250),
    );
    ledger.record_entry(rent).await?;
    println!("  ✓ Recorded: Services expense of 250");

    // An unbalanced entry never reaches the books
    let typo = JournalEntryBuilder::new(ledger.next_entry_number().await?, day(3, 29), "Typo")
        .debit("1041", BigDecimal::from(500))
        .credit("7011", BigDecimal::from(490))
        .confirmed();
    if let Err(err) = ledger.record_entry(typo).await {
        println!("  ❌ Rejected: {}", err);
    }

    // 3. General ledger
    let march = Period::between(day(3, 1), day(3, 31));
    let bank = ledger.account_ledger("1041", march).await?;
    println!("\n📒 General Ledger {} - {} (March 2024):", bank.account.code, bank.account.name);
    println!("  Opening balance: {}", bank.opening_balance);
    for line in &bank.movements {
        println!(
            "  {} #{:<4} {:<24} Dr {:>8} Cr {:>8} = {}",
            line.date, line.entry_number, line.description, line.debit, line.credit, line.running_balance
        );
    }
    println!("  Closing balance: {}", bank.closing_balance);

    // 4. Financial statements
    println!("\n📈 Generating Financial Statements...\n");
    let groups = PrefixTable::new("Other".to_string())
        .with("10", "Cash and cash equivalents".to_string())
        .with("33", "Property, plant and equipment".to_string())
        .with("4", "Current liabilities".to_string())
        .with("5", "Equity".to_string())
        .with("6", "Operating expenses".to_string())
        .with("7", "Revenue".to_string());

    let trial_balance = ledger.trial_balance(march).await?;
    println!("🔍 Trial Balance for March 2024:");
    for row in &trial_balance.rows {
        println!(
            "  {:<6} {:<36} Dr {:>8} Cr {:>8}",
            row.code, row.name, row.period_debit, row.period_credit
        );
    }
    println!("  Totals: Dr {} Cr {}\n", trial_balance.total_debit, trial_balance.total_credit);

    let balance_sheet = ledger.balance_sheet(march, &groups).await?;
    println!("📊 Balance Sheet as of March 31, 2024:");
    for (title, groups) in [
        ("Assets", &balance_sheet.assets),
        ("Liabilities", &balance_sheet.liabilities),
        ("Equity", &balance_sheet.equity),
    ] {
        println!("  {}:", title);
        for group in groups {
            println!("    {}: {}", group.group_name, group.group_total);
            for row in &group.rows {
                println!("      {} {}: {}", row.code, row.name, row.balance);
            }
        }
    }
    println!("  Total Assets: {}", balance_sheet.total_assets);
    println!(
        "  Total Liabilities + Equity: {}\n",
        balance_sheet.total_liabilities_and_equity()
    );

    let bands = PrefixTable::new(IncomeBand::Other)
        .with("70", IncomeBand::Sales)
        .with("69", IncomeBand::CostOfSales)
        .with("6", IncomeBand::Operating);
    let income_statement = ledger
        .income_statement_with_bands(march, &groups, &bands)
        .await?;
    println!("💹 Income Statement for March 2024:");
    println!("  Total Income:  {}", income_statement.total_income);
    println!("  Total Expense: {}", income_statement.total_expense);
    if let Some(bands) = &income_statement.bands {
        println!("  Gross Profit:      {}", bands.gross_profit);
        println!("  Operating Result:  {}", bands.operating_result);
    }
    println!("  Net Income: {}\n", income_statement.net_income);

    let buckets = PrefixTable::new(CashFlowBucket::Operating)
        .with("33", CashFlowBucket::Investing)
        .with("45", CashFlowBucket::Financing)
        .with("50", CashFlowBucket::Financing);
    let is_cash = |account: &bookkeeping_core::Account| account.code.starts_with("10");
    let cash_flow = ledger.cash_flow(march, &is_cash, &buckets).await?;
    println!("💵 Cash Flow for March 2024:");
    println!("  Opening cash: {}", cash_flow.opening_cash);
    for bucket in CashFlowBucket::ALL {
        println!("  {}: {}", bucket, cash_flow.section(bucket).total);
    }
    println!("  Closing cash: {}", cash_flow.closing_cash);

    // 5. Bank reconciliation
    println!("\n🏦 Reconciling the bank statement...");
    ledger
        .import_bank_movement(&BankMovement::new(
            "stmt-0325-01".to_string(),
            day(3, 26),
            BigDecimal::from(4000),
            BankDirection::DebitFromAccount,
            "1041".to_string(),
            Some("Wire to Vans S.A.".to_string()),
        ))
        .await?;
    let bank_line = van
        .movements
        .iter()
        .find(|m| m.account_id == "1041")
        .ok_or("van purchase has no bank movement")?;
    ledger.match_movements("stmt-0325-01", &bank_line.id).await?;

    let summary = ledger.reconciliation_summary("1041").await?;
    println!(
        "  Bank: {} reconciled, {} pending ({})",
        summary.bank.reconciled_count, summary.bank.pending_count, summary.bank.pending_amount
    );
    println!(
        "  Books: {} reconciled, {} pending ({})",
        summary.accounting.reconciled_count,
        summary.accounting.pending_count,
        summary.accounting.pending_amount
    );
    println!("  Unreconciled difference: {}", summary.unreconciled_difference);

    // 6. Validate ledger integrity
    println!("\n🔍 Validating Ledger Integrity...");
    let integrity_report = ledger.validate_integrity(Period::up_to(day(3, 31))).await?;

    if integrity_report.is_valid {
        println!("  ✅ Ledger integrity check passed!");
    } else {
        println!("  ❌ Ledger integrity check failed:");
        for issue in &integrity_report.issues {
            println!("    - {}", issue);
        }
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
