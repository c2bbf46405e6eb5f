//! Example 01: Member Dashboard
//!
//! This example builds the member table of an admin dashboard: search,
//! status filter, join date sort, pagination and the stats header.
//!
//! Run with: cargo run --example 01_member_dashboard

use chrono::NaiveDate;
use clubview::models::{Member, MemberStatus};
use clubview::{CollectionView, FilterRule, MemoryCollaborator, Record, SortSpec};
use eyre::Result;

fn member(id: &str, name: &str, status: MemberStatus, joined: (i32, u32, u32)) -> Member {
    Member {
        id: id.to_string(),
        name: name.to_string(),
        username: name.to_lowercase().replace(' ', "."),
        email: format!("{}@club.test", name.to_lowercase().replace(' ', ".")),
        role: "member".to_string(),
        status,
        join_date: NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).unwrap_or_default(),
    }
}

fn main() -> Result<()> {
    println!("Member Dashboard Example");
    println!("========================\n");

    let backend = MemoryCollaborator::new(vec![
        member("m1", "John Smith", MemberStatus::Active, (2024, 1, 1)),
        member("m2", "Jane Doe", MemberStatus::Suspended, (2024, 1, 10)),
        member("m3", "Ali Khan", MemberStatus::Active, (2024, 1, 5)),
        member("m4", "Maria Rossi", MemberStatus::Pending, (2024, 2, 14)),
        member("m5", "Sam Lee", MemberStatus::Active, (2023, 11, 30)),
    ]);

    let mut view = CollectionView::new(backend).with_stats(Member::stats_spec());
    let loaded = view.refresh()?;
    println!("Loaded {} members\n", loaded);

    // Stats cover the whole collection, whatever the filter
    println!("1. Stats header:");
    for (name, value) in view.stats().iter() {
        println!("   {:<12} {}", name, value);
    }

    println!("\n2. Active members, oldest first:");
    view.set_rule("status", FilterRule::exact("active"));
    view.set_sort(Some(SortSpec::asc("joinDate")));
    for m in view.view() {
        println!("   {} {} (joined {})", m.id(), m.name, m.join_date);
    }

    println!("\n3. Search \"john\" across name, username and email:");
    view.set_rule("status", FilterRule::exact("all"));
    view.set_rule("search", FilterRule::text("john", Member::SEARCH_FIELDS));
    for m in view.view() {
        println!("   {} {} <{}>", m.id(), m.name, m.email);
    }

    println!("\n4. Everyone, newest first, two per page:");
    view.clear_rule("search");
    view.set_sort(Some(SortSpec::desc("joinDate")));
    let mut page_no = 1;
    loop {
        let page = view.page(page_no, 2);
        let names: Vec<&str> = page.items.iter().map(|m| m.name.as_str()).collect();
        println!("   page {}/{}: {}", page.page, page.total_pages, names.join(", "));
        if !page.has_next {
            break;
        }
        page_no += 1;
    }

    println!("\n5. Saved view state:");
    println!("   {}", view.view_state().to_json()?);

    Ok(())
}
