use crate::infra::{build_service, ApiService};
use cafe_hub::error::AppError;
use cafe_hub::workflows::lifecycle::{
    ActivityId, Actor, GuestApplicationForm, LifecycleStatus, ParticipationRequestBucket,
    ParticipationRequestForm, ParticipationRequestStatus, RetryPolicy, StatusBucket,
    StatusSummary, TransitionError, VendorApplicationBucket, VendorApplicationForm,
    VendorApplicationStatus,
};
use clap::Args;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Activity id used for the participation request walkthrough.
    #[arg(long, default_value = "act-winter-wreath-workshop")]
    pub(crate) activity: String,
    /// Member id acting as vendor and participant.
    #[arg(long, default_value = "member-demo")]
    pub(crate) member: String,
    /// Print the closing dashboard summaries as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        activity,
        member,
        json,
    } = args;

    let (service, _) = build_service(RetryPolicy::default());
    let member = Actor::member(member);
    let admin = Actor::admin("admin-demo");

    println!("Cafe back office lifecycle demo");
    vendor_walkthrough(&service, &member, &admin).await?;
    participation_walkthrough(&service, ActivityId(activity), &member, &admin).await?;

    let applications = service.vendor_application_summary()?;
    let requests = service.participation_request_summary()?;
    if json {
        let payload = serde_json::json!({
            "market_applications": applications,
            "participation_requests": requests,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );
    } else {
        render_summary::<VendorApplicationBucket>("Market applications", &applications);
        render_summary::<ParticipationRequestBucket>("Participation requests", &requests);
    }

    Ok(())
}

async fn vendor_walkthrough(
    service: &ApiService,
    member: &Actor,
    admin: &Actor,
) -> Result<(), AppError> {
    println!("\nMarket vendor application");
    let application = service.intake().submit_member_application(
        VendorApplicationForm {
            brand_name: "Kar Tanesi Atölye".to_string(),
            instagram: "https://instagram.com/kartanesi".to_string(),
            day27: true,
            day28: false,
            logo_url: "market-logos/kartanesi.png".to_string(),
            description: "Hand painted ceramic ornaments and soy candles.".to_string(),
        },
        member,
    )?;
    println!(
        "- submitted {} ({})",
        application.id,
        application.status.display_label()
    );

    let steps = [
        (VendorApplicationStatus::ApprovedWaitingPayment, admin),
        (VendorApplicationStatus::PaymentSubmitted, member),
        (VendorApplicationStatus::Completed, admin),
    ];
    for (target, actor) in steps {
        let updated = service
            .transition_vendor_application(&application.id, target, None, actor)
            .await?;
        println!(
            "- {} -> {} by {}",
            application.id,
            updated.status.display_label(),
            actor.user_id
        );
        if let Some(confirmed) = updated.payment_confirmed_at {
            println!("  payment confirmed at {}", confirmed.to_rfc3339());
        }
    }

    let guest = service
        .intake()
        .submit_guest_application(GuestApplicationForm {
            application: VendorApplicationForm {
                brand_name: "Fındık Kahve".to_string(),
                instagram: "https://instagram.com/findikkahve".to_string(),
                day27: false,
                day28: true,
                logo_url: "market-logos/findik.png".to_string(),
                description: "Small batch roasted beans and cold brew bottles.".to_string(),
            },
            guest_email: "hello@findikkahve.example".to_string(),
            guest_phone: "05321234567".to_string(),
        })?;
    service.executor().transition_vendor_application(
        &guest.id,
        VendorApplicationStatus::Rejected,
        Some("stall capacity reached".to_string()),
        admin,
    )?;
    println!("- guest application {} rejected by {}", guest.id, admin.user_id);

    Ok(())
}

async fn participation_walkthrough(
    service: &ApiService,
    activity: ActivityId,
    member: &Actor,
    admin: &Actor,
) -> Result<(), AppError> {
    println!("\nActivity participation request ({activity})");
    let request = service.intake().request_participation(
        activity.clone(),
        ParticipationRequestForm {
            user_name: Some("Deniz Aydın".to_string()),
            ..ParticipationRequestForm::default()
        },
        member,
    )?;

    for (target, actor) in [
        (ParticipationRequestStatus::PaymentSubmitted, member),
        (ParticipationRequestStatus::Approved, admin),
    ] {
        let updated = service
            .transition_participation_request(&request.id, target, None, actor)
            .await?;
        println!(
            "- {} -> {} by {}",
            request.id,
            updated.status.display_label(),
            actor.user_id
        );
    }

    let attendance = service.attendance(&activity)?;
    println!("- attendance records: {}", attendance.len());
    for record in &attendance {
        println!("  {} (attended: {})", record.user_name, record.attended);
    }

    match service.executor().transition_participation_request(
        &request.id,
        ParticipationRequestStatus::Rejected,
        None,
        admin,
    ) {
        Err(err @ TransitionError::InvalidTransition { .. }) => {
            println!("- reversal refused: {err}");
        }
        Err(err) => return Err(err.into()),
        Ok(_) => println!("- reversal applied"),
    }

    Ok(())
}

fn render_summary<B: StatusBucket>(title: &str, summary: &StatusSummary) {
    println!("\n{title}: {} total", summary.total);
    for bucket in B::ALL {
        println!(
            "  - {}: {}",
            bucket.label(),
            summary.bucket_count(bucket.label())
        );
    }
    for status in <B::Status as LifecycleStatus>::ALL {
        println!(
            "    {} ({}): {}",
            status.label(),
            status.display_label(),
            summary.status_count(status.label())
        );
    }
}
