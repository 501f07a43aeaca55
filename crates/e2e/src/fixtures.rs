use brokerdesk_api::{AgentCreate, AgentSignupForm, PropertyCreate};

/// Admin-side agent payload. The slug is left to the server.
pub fn agent(email: &str, premium: bool) -> AgentCreate {
    AgentCreate {
        name: "Ayşe Güneş".into(),
        email: email.to_string(),
        phone: "+90 532 000 00 00".into(),
        company: Some("Güneş Gayrimenkul".into()),
        experience: Some("12".into()),
        profile_photo_url: None,
        city: Some("İzmir".into()),
        happy_customers: Some(240),
        successful_sales: Some(180),
        instagram_url: None,
        facebook_url: None,
        slug: None,
        is_premium: premium,
    }
}

/// Landing-page sign-up form; counters are text as the browser sends them.
pub fn signup_form(name: &str, email: &str) -> AgentSignupForm {
    AgentSignupForm {
        name: name.to_string(),
        email: email.to_string(),
        phone: "+90 555 123 45 67".into(),
        company: "Metra Emlak".into(),
        experience: "5".into(),
        city: "Ankara".into(),
        happy_customers: "42".into(),
        successful_sales: "17".into(),
        instagram_url: String::new(),
        facebook_url: String::new(),
        slug: String::new(),
    }
}

/// A land listing with a couple of spec tags.
pub fn land_listing(title: &str) -> PropertyCreate {
    PropertyCreate {
        title: title.to_string(),
        status: "Satılık".into(),
        category: "ARSA".into(),
        price: Some("3.250.000 ₺".into()),
        location: Some("Urla, İzmir".into()),
        area: Some("1.200 m²".into()),
        zoning_status: Some("Konut imarlı".into()),
        specs: Some(vec![" Yola cepheli ".into(), "".into(), "Elektrik var".into()]),
        ..PropertyCreate::default()
    }
}

/// An apartment listing without spec tags.
pub fn apartment_listing(title: &str) -> PropertyCreate {
    PropertyCreate {
        title: title.to_string(),
        status: "kiralık".into(),
        category: "daire".into(),
        rooms: Some("2+1".into()),
        floor: Some("3".into()),
        building_age: Some("8".into()),
        featured: true,
        ..PropertyCreate::default()
    }
}
