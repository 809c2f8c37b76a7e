mod common;

use trellis::{GraphTraversalSource, Operator, P, Steps, Value, __};

use common::{movies, people, sorted, strings, tanks};

fn movies_all_friends_like(g: &GraphTraversalSource) -> Vec<Value> {
    g.v()
        .has_value("name", "alice")
        .as_("a")
        .out(&["friend"])
        .out(&["like"])
        .dedup()
        .as_("m")
        .not(
            __::select(&["a"])
                .out(&["friend"])
                .not(__::out(&["like"]).where_p(P::eq("m"))),
        )
        .values(&["name"])
        .to_list()
        .unwrap()
}

#[test]
fn movies_every_friend_likes() {
    let fixture = movies();

    assert_eq!(movies_all_friends_like(&fixture.g), strings(&["young guns"]));
    assert_eq!(
        movies_all_friends_like(&fixture.g.clone().with_computer()),
        strings(&["young guns"])
    );
}

fn fill_tanks(g: GraphTraversalSource, source: trellis::VertexId) {
    g.with_sack(0.0)
        .v_ids([source])
        .sack_with(Operator::Assign)
        .by_key("amount")
        .repeat(
            __::out(&["pipe"])
                .sack_with(Operator::Mult)
                .by_key("factor")
                .property_by("amount", __::sack()),
        )
        .times(2)
        .iterate()
        .unwrap();
}

#[test]
fn sacks_carry_water_down_the_pipes() {
    for computer in [false, true] {
        let fixture = tanks();
        let (a, b, c) = (fixture.ids[0], fixture.ids[1], fixture.ids[2]);
        let g = if computer {
            fixture.g.clone().with_computer()
        } else {
            fixture.g.clone()
        };

        fill_tanks(g, a);

        assert_eq!(fixture.property(a, "amount"), Some(Value::Float(100.0)));
        assert_eq!(fixture.property(b, "amount"), Some(Value::Float(50.0)));
        assert_eq!(fixture.property(c, "amount"), Some(Value::Float(5.0)));
    }
}

fn age_everyone(g: GraphTraversalSource) {
    g.with_sack(0)
        .v()
        .has_key("age")
        .sack_with(Operator::Assign)
        .by_key("age")
        .sack_with(Operator::Sum)
        .by_traversal(__::constant(10))
        .property_by("age", __::sack())
        .iterate()
        .unwrap();
}

#[test]
fn ages_are_written_back() {
    for computer in [false, true] {
        let fixture = people();
        let g = if computer {
            fixture.g.clone().with_computer()
        } else {
            fixture.g.clone()
        };

        age_everyone(g);

        let ages: Vec<_> = fixture.ids.iter().map(|&v| fixture.property(v, "age")).collect();
        assert_eq!(
            ages,
            [Some(Value::Int(40)), Some(Value::Int(35)), Some(Value::Int(45)), None]
        );
        assert_eq!(
            sorted(fixture.g.v().values(&["age"]).to_list().unwrap()),
            [Value::Int(35), Value::Int(40), Value::Int(45)]
        );
    }
}

#[test]
fn sack_operators_take_the_sack_on_the_left() {
    let fixture = people();
    let alice = fixture.ids[0];

    let found = fixture
        .g
        .with_sack(10)
        .v_ids([alice])
        .sack_with(Operator::Minus)
        .by_key("age")
        .sack()
        .to_list()
        .unwrap();

    assert_eq!(found, [Value::Int(-20)]);
}
